// runner::recorder
// > recording file naming, collision-free against published and in-progress files
pub mod consolidate;

use crate::comm_fs;
use crate::comm_media::{RecFileStatus, SessionDateKey};
use crate::runner::RunnerError;
use std::path::{Path, PathBuf};

//
// ex) 01-02-2024-meeting.mp4      first recording of the day
//     01-02-2024-meeting_0.mp4    base name already taken
//     01-02-2024_1704200000.mp4   merged from several fragments
//

// marks capture fragments, merged files carry only `_{epoch}`
pub const FRAGMENT_NAME_TAG: &str = "-meeting";

pub fn base_file_name(date_key: &SessionDateKey, ext: &str) -> String {
    format!("{}{}.{}", date_key, FRAGMENT_NAME_TAG, ext)
}

pub fn suffixed_file_name(date_key: &SessionDateKey, suffix: u32, ext: &str) -> String {
    format!("{}{}_{}.{}", date_key, FRAGMENT_NAME_TAG, suffix, ext)
}

pub fn merged_file_name(date_key: &SessionDateKey, epoch: i64, ext: &str) -> String {
    format!("{}_{}.{}", date_key, epoch, ext)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFileDesc {
    pub date_key: SessionDateKey,
    pub suffix: Option<u32>,
    pub file_name: String,
    pub path: PathBuf,
    pub file_status: RecFileStatus,
}

// returns a fragment path inside `work_dir` whose name is taken neither in
// `published_dir` nor in `work_dir`
// > single writer, two resolvers racing on the same dirs may pick the same name
pub async fn resolve(
    date_key: &SessionDateKey,
    work_dir: &Path,
    published_dir: &Path,
    ext: &str,
) -> Result<RecordFileDesc, RunnerError> {
    let candidate = base_file_name(date_key, ext);

    let published = comm_fs::list_file_names(&published_dir)
        .await
        .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;
    let in_progress = comm_fs::list_file_names(&work_dir)
        .await
        .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

    let is_taken = |name: &str| published.contains(name) || in_progress.contains(name);

    if !is_taken(&candidate) {
        return Ok(RecordFileDesc {
            date_key: date_key.clone(),
            suffix: None,
            path: work_dir.join(&candidate),
            file_name: candidate,
            file_status: RecFileStatus::Fragment,
        });
    }

    let mut suffix: u32 = 0;

    loop {
        let candidate = suffixed_file_name(date_key, suffix, ext);

        if !is_taken(&candidate) {
            log::debug!(
                "[recorder::resolve] base name is taken, resolved to {}",
                candidate
            );

            return Ok(RecordFileDesc {
                date_key: date_key.clone(),
                suffix: Some(suffix),
                path: work_dir.join(&candidate),
                file_name: candidate,
                file_status: RecFileStatus::Fragment,
            });
        }

        suffix = suffix.checked_add(1).ok_or_else(|| {
            RunnerError::InternalError(format!(
                "no free recording file name for date key {}",
                date_key
            ))
        })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionDateKey {
        SessionDateKey::parse("01-02-2024").unwrap()
    }

    fn dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("work");
        let published = root.path().join("published");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::create_dir_all(&published).unwrap();
        (root, work, published)
    }

    #[tokio::test]
    async fn empty_dirs_resolve_to_base_name_in_work_dir() {
        let (_root, work, published) = dirs();

        let desc = resolve(&key(), &work, &published, "mp4").await.unwrap();

        assert_eq!(desc.path, work.join("01-02-2024-meeting.mp4"));
        assert_eq!(desc.suffix, None);
        assert_eq!(desc.file_status, RecFileStatus::Fragment);
    }

    #[tokio::test]
    async fn published_base_name_resolves_to_suffix_zero() {
        let (_root, work, published) = dirs();
        std::fs::write(published.join("01-02-2024-meeting.mp4"), b"x").unwrap();

        let desc = resolve(&key(), &work, &published, "mp4").await.unwrap();

        assert_eq!(desc.path, work.join("01-02-2024-meeting_0.mp4"));
        assert_eq!(desc.suffix, Some(0));
    }

    #[tokio::test]
    async fn skips_taken_suffixes_in_both_dirs() {
        let (_root, work, published) = dirs();
        std::fs::write(published.join("01-02-2024-meeting.mp4"), b"x").unwrap();
        std::fs::write(published.join("01-02-2024-meeting_0.mp4"), b"x").unwrap();
        std::fs::write(work.join("01-02-2024-meeting_1.mp4"), b"x").unwrap();
        std::fs::write(published.join("01-02-2024-meeting_3.mp4"), b"x").unwrap();

        let desc = resolve(&key(), &work, &published, "mp4").await.unwrap();

        assert_eq!(desc.file_name, "01-02-2024-meeting_2.mp4");
    }

    #[tokio::test]
    async fn base_name_left_in_work_dir_is_not_reused() {
        let (_root, work, published) = dirs();
        std::fs::write(work.join("01-02-2024-meeting.mp4"), b"x").unwrap();

        let desc = resolve(&key(), &work, &published, "mp4").await.unwrap();

        assert_eq!(desc.file_name, "01-02-2024-meeting_0.mp4");
    }

    #[tokio::test]
    async fn never_collides_with_existing_names() {
        let (_root, work, published) = dirs();
        let k = key();

        // grow the published set one resolution at a time
        for i in 0..12 {
            let desc = resolve(&k, &work, &published, "mp4").await.unwrap();

            assert!(!published.join(&desc.file_name).exists());
            assert!(!work.join(&desc.file_name).exists());

            let target = if i % 3 == 0 { &work } else { &published };
            std::fs::write(target.join(&desc.file_name), b"x").unwrap();
        }
    }

    #[tokio::test]
    async fn other_extensions_and_dates_do_not_collide() {
        let (_root, work, published) = dirs();
        std::fs::write(published.join("01-02-2024-meeting.mkv"), b"x").unwrap();
        std::fs::write(published.join("01-03-2024-meeting.mp4"), b"x").unwrap();

        let desc = resolve(&key(), &work, &published, "mp4").await.unwrap();

        assert_eq!(desc.file_name, "01-02-2024-meeting.mp4");
    }
}
