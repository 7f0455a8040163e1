use crate::error::Error;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[macro_export]
macro_rules! RecPathToString {
    ($x:expr) => {{
        $x.to_string_lossy().to_string()
    }};
}

pub fn create_dir_sync<P: AsRef<Path>>(path: &P) -> Result<(), Error> {
    use std::fs;

    if let Ok(attr) = fs::metadata(path) {
        if attr.is_dir() {
            return Ok(());
        }

        return Err(Error::InvalidPath(format!(
            "path is not directory,{}",
            path.as_ref().display()
        )));
    }

    fs::create_dir_all(path).map_err(|e| Error::IoError(e.to_string()))?;

    Ok(())
}

// async
pub async fn create_dir<P: AsRef<Path>>(path: &P) -> Result<(), Error> {
    use tokio::fs;

    if let Ok(attr) = fs::metadata(path).await {
        if attr.is_dir() {
            return Ok(());
        }

        return Err(Error::InvalidPath(format!(
            "path is not directory,{}",
            path.as_ref().display()
        )));
    }

    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::IoError(e.to_string()))?;

    Ok(())
}

// file names (not paths) of the regular files in `dir`
// > missing directory is treated as empty
pub async fn list_file_names<P: AsRef<Path>>(dir: &P) -> Result<HashSet<String>, Error> {
    let mut names = HashSet::new();

    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => {
            return Err(Error::IoError(format!(
                "failed to read dir {}, e={}",
                dir.as_ref().display(),
                e
            )))
        }
    };

    while let Some(entry) = rd
        .next_entry()
        .await
        .map_err(|e| Error::IoError(e.to_string()))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);

        if is_file {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
    }

    Ok(names)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
}

// regular files in `dir` whose name is `{prefix}*.{ext}`,
// > sorted by modification time then by file name
pub async fn find_files_with_prefix<P: AsRef<Path>>(
    dir: &P,
    prefix: &str,
    ext: &str,
) -> Result<Vec<MatchedFile>, Error> {
    let suffix = format!(".{}", ext);
    let mut found = Vec::new();

    for file_name in list_file_names(dir).await? {
        if !file_name.starts_with(prefix) || !file_name.ends_with(&suffix) {
            continue;
        }

        // "{prefix}.{ext}" itself must still be long enough to hold both parts
        if file_name.len() < prefix.len() + suffix.len() {
            continue;
        }

        let path = dir.as_ref().join(&file_name);
        let modified = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| Error::IoError(format!("{}, e={}", path.display(), e)))?;

        found.push(MatchedFile {
            path,
            file_name,
            modified,
        });
    }

    found.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });

    Ok(found)
}

// rename, falling back to copy + remove when src and dst are on different filesystems
pub async fn move_file<P: AsRef<Path>, Q: AsRef<Path>>(src: &P, dst: &Q) -> Result<(), Error> {
    use tokio::fs;

    if let Err(rename_err) = fs::rename(src, dst).await {
        log::debug!(
            "[comm_fs::move_file] rename failed, falling back to copy, src={}, dst={}, e={}",
            src.as_ref().display(),
            dst.as_ref().display(),
            rename_err
        );

        fs::copy(src, dst).await.map_err(|e| {
            Error::IoError(format!(
                "failed to copy {} to {}, e={}",
                src.as_ref().display(),
                dst.as_ref().display(),
                e
            ))
        })?;

        fs::remove_file(src).await.map_err(|e| {
            Error::IoError(format!(
                "copied but failed to remove {}, e={}",
                src.as_ref().display(),
                e
            ))
        })?;
    }

    Ok(())
}

pub async fn remove_file<P: AsRef<Path>>(path: &P) -> Result<(), Error> {
    tokio::fs::remove_file(path).await.map_err(|e| {
        Error::IoError(format!(
            "failed to remove {}, e={}",
            path.as_ref().display(),
            e
        ))
    })
}

pub async fn file_size<P: AsRef<Path>>(path: &P) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}
