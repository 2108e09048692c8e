use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use walkdir::WalkDir;
use zip::{write::FileOptions, ZipWriter};

use crate::config::CompressFormat;
use crate::constants::PARTIAL_ARCHIVE_SUFFIX;

/// Package the staging directory into `<output_base>.<ext>`.
///
/// The archive root holds the staging directory's immediate children; the
/// staging directory's own name is not nested an extra level. The archive is
/// written under a temporary name and renamed into place afterwards, so a
/// concurrent reader never observes a partially written artifact at the
/// final path.
pub fn make_archive(
    staging_dir: &Path,
    output_base: &Path,
    format: CompressFormat,
) -> Result<PathBuf> {
    let final_path = PathBuf::from(format!(
        "{}.{}",
        output_base.display(),
        format.extension()
    ));
    let partial_path = PathBuf::from(format!(
        "{}.{}",
        final_path.display(),
        PARTIAL_ARCHIVE_SUFFIX
    ));

    debug!(
        "Building {} archive at {}",
        format.extension(),
        partial_path.display()
    );

    match format {
        CompressFormat::Zip => write_zip(staging_dir, &partial_path)?,
        CompressFormat::Tar => {
            let file = create_partial(&partial_path)?;
            write_tar(staging_dir, file)?;
        }
        CompressFormat::Gztar => {
            let file = create_partial(&partial_path)?;
            let encoder = write_tar(staging_dir, GzEncoder::new(file, flate2::Compression::default()))?;
            encoder.finish().context("Failed to finish gzip stream")?;
        }
        CompressFormat::Bztar => {
            let file = create_partial(&partial_path)?;
            let encoder = write_tar(staging_dir, BzEncoder::new(file, bzip2::Compression::default()))?;
            encoder.finish().context("Failed to finish bzip2 stream")?;
        }
    }

    fs::rename(&partial_path, &final_path).context(format!(
        "Failed to move archive into place at {}",
        final_path.display()
    ))?;

    info!("Created archive {}", final_path.display());
    Ok(final_path)
}

fn create_partial(path: &Path) -> Result<File> {
    File::create(path).context(format!("Failed to create archive file {}", path.display()))
}

fn write_zip(staging_dir: &Path, partial_path: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(create_partial(partial_path)?);
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in WalkDir::new(staging_dir).min_depth(1) {
        let entry = entry.context("Failed to walk staging directory")?;
        let rel = entry
            .path()
            .strip_prefix(staging_dir)
            .context("Staged path outside staging directory")?
            .to_string_lossy()
            .replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", rel), FileOptions::default())
                .context(format!("Failed to add directory entry {}", rel))?;
        } else {
            zip.start_file(rel.clone(), options)
                .context(format!("Failed to start archive entry {}", rel))?;
            let mut reader = BufReader::new(
                File::open(entry.path())
                    .context(format!("Failed to open {}", entry.path().display()))?,
            );
            io::copy(&mut reader, &mut zip)
                .context(format!("Failed to write archive entry {}", rel))?;
        }
    }

    zip.finish().context("Failed to finalize zip archive")?;
    Ok(())
}

fn write_tar<W: Write>(staging_dir: &Path, writer: W) -> Result<W> {
    let mut builder = tar::Builder::new(writer);

    for entry in WalkDir::new(staging_dir).min_depth(1) {
        let entry = entry.context("Failed to walk staging directory")?;
        let rel = entry
            .path()
            .strip_prefix(staging_dir)
            .context("Staged path outside staging directory")?;

        if entry.file_type().is_dir() {
            builder
                .append_dir(rel, entry.path())
                .context(format!("Failed to add directory entry {}", rel.display()))?;
        } else {
            builder
                .append_path_with_name(entry.path(), rel)
                .context(format!("Failed to add archive entry {}", rel.display()))?;
        }
    }

    builder.into_inner().context("Failed to finalize tar archive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::read::ZipArchive;

    fn staged_tree() -> TempDir {
        let staging = TempDir::new().unwrap();
        fs::create_dir_all(staging.path().join("app/var/log")).unwrap();
        fs::create_dir_all(staging.path().join("system")).unwrap();
        fs::write(staging.path().join("app/var/log/a.log"), "alpha\n").unwrap();
        fs::write(staging.path().join("system/syslog"), "beta\n").unwrap();
        staging
    }

    fn tar_entry_names<R: Read>(reader: R) -> HashSet<String> {
        let mut archive = tar::Archive::new(reader);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_zip_archive_contains_staging_children_at_root() {
        let staging = staged_tree();
        let out = TempDir::new().unwrap();
        let base = out.path().join("run-1");

        let artifact = make_archive(staging.path(), &base, CompressFormat::Zip).unwrap();
        assert_eq!(artifact, out.path().join("run-1.zip"));

        let mut archive = ZipArchive::new(File::open(&artifact).unwrap()).unwrap();
        let names: HashSet<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert!(names.contains("app/var/log/a.log"), "names: {:?}", names);
        assert!(names.contains("system/syslog"), "names: {:?}", names);
        // The staging directory's own name must not be nested into the root.
        let staging_name = staging.path().file_name().unwrap().to_string_lossy();
        assert!(names.iter().all(|n| !n.starts_with(staging_name.as_ref())));

        let mut content = String::new();
        archive
            .by_name("app/var/log/a.log")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "alpha\n");
    }

    #[test]
    fn test_no_partial_file_remains_after_build() {
        let staging = staged_tree();
        let out = TempDir::new().unwrap();
        let base = out.path().join("run-2");

        make_archive(staging.path(), &base, CompressFormat::Zip).unwrap();

        let leftovers: Vec<_> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(PARTIAL_ARCHIVE_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "partial files left: {:?}", leftovers);
    }

    #[test]
    fn test_tar_archive_round_trip() {
        let staging = staged_tree();
        let out = TempDir::new().unwrap();

        let artifact =
            make_archive(staging.path(), &out.path().join("run-3"), CompressFormat::Tar).unwrap();
        assert_eq!(artifact, out.path().join("run-3.tar"));

        let names = tar_entry_names(File::open(&artifact).unwrap());
        assert!(names.contains("app/var/log/a.log"));
        assert!(names.contains("system/syslog"));
    }

    #[test]
    fn test_gztar_archive_round_trip() {
        let staging = staged_tree();
        let out = TempDir::new().unwrap();

        let artifact = make_archive(
            staging.path(),
            &out.path().join("run-4"),
            CompressFormat::Gztar,
        )
        .unwrap();
        assert_eq!(artifact, out.path().join("run-4.tar.gz"));

        let decoder = flate2::read::GzDecoder::new(File::open(&artifact).unwrap());
        let names = tar_entry_names(decoder);
        assert!(names.contains("app/var/log/a.log"));
    }

    #[test]
    fn test_bztar_archive_round_trip() {
        let staging = staged_tree();
        let out = TempDir::new().unwrap();

        let artifact = make_archive(
            staging.path(),
            &out.path().join("run-5"),
            CompressFormat::Bztar,
        )
        .unwrap();
        assert_eq!(artifact, out.path().join("run-5.tar.bz2"));

        let decoder = bzip2::read::BzDecoder::new(File::open(&artifact).unwrap());
        let names = tar_entry_names(decoder);
        assert!(names.contains("system/syslog"));
    }

    #[test]
    fn test_empty_staging_directory_produces_valid_archive() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let artifact =
            make_archive(staging.path(), &out.path().join("run-6"), CompressFormat::Zip).unwrap();

        let archive = ZipArchive::new(File::open(&artifact).unwrap()).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
