// runner::recorder::consolidate
// > merges every file of a date key into one published file
use super::{merged_file_name, FRAGMENT_NAME_TAG};
use crate::comm::get_rec_epoch;
use crate::comm_fs;
use crate::comm_media::SessionDateKey;
use crate::config::Config;
use crate::mlog;
use crate::RecPathToString;
use crate::runner::ffmpeg::{self, cmd::FFMpegCmd};
use crate::runner::RunnerError;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidateRst {
    // nothing usable was captured, (reason)
    Skipped(String),

    // no other file for the date key, fragment moved as is
    Published(PathBuf),

    // fragments merged into `out_path`, inputs removed
    Merged {
        out_path: PathBuf,
        input_cnt: usize,
        cleanup_failed_cnt: usize,
    },
}

pub struct FragmentConsolidator {
    published_dir: PathBuf,
    work_dir: PathBuf,
    ext: String,

    ffmpeg_path: String,
    ffmpeg_verbose: String,
    ffmpeg_log_dir: Option<PathBuf>,
}

// manifest lines are `file <path>` without quoting
fn is_manifest_safe(path: &Path) -> bool {
    match path.to_str() {
        Some(s) => !s
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '\'' || c == '"' || c == '\\'),
        None => false,
    }
}

impl FragmentConsolidator {
    pub fn new(config: &Config, work_dir: PathBuf) -> Self {
        Self {
            published_dir: config.recorder_dest_dir.clone(),
            work_dir,
            ext: config.recorder_file_type.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffmpeg_verbose: config.ffmpeg_verbose.clone(),
            ffmpeg_log_dir: config.ffmpeg_log_dir.clone(),
        }
    }

    pub async fn consolidate(
        &self,
        fresh_path: &Path,
        date_key: &SessionDateKey,
    ) -> Result<ConsolidateRst, RunnerError> {
        comm_fs::create_dir(&self.published_dir)
            .await
            .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

        match comm_fs::file_size(&fresh_path).await {
            None => {
                let reason = format!("no fragment at {}", fresh_path.display());
                log::warn!("[FragmentConsolidator::consolidate] {}, skipped", reason);

                return Ok(ConsolidateRst::Skipped(reason));
            }
            Some(0) => {
                let reason = format!("empty fragment at {}", fresh_path.display());
                log::warn!("[FragmentConsolidator::consolidate] {}, removing", reason);

                if let Err(e) = comm_fs::remove_file(&fresh_path).await {
                    log::error!(
                        "[FragmentConsolidator::consolidate] {}",
                        RunnerError::FragmentCleanupErr(e.to_string())
                    );
                }

                return Ok(ConsolidateRst::Skipped(reason));
            }
            Some(_) => {}
        }

        let fresh_name = fresh_path
            .file_name()
            .ok_or_else(|| {
                RunnerError::FileOperErr(format!("no file name in {}", fresh_path.display()))
            })?
            .to_os_string();

        let mut matched = comm_fs::find_files_with_prefix(
            &self.published_dir,
            date_key.as_str(),
            &self.ext,
        )
        .await
        .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

        // fragments kept by an earlier failed merge
        matched.extend(self.leftover_fragments(fresh_path, date_key).await?);

        matched.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        let existing: Vec<PathBuf> = matched
            .into_iter()
            .map(|f| f.path)
            .filter(|p| p.as_path() != fresh_path)
            .collect();

        //
        // case A: only the fresh fragment, move it
        //

        if existing.is_empty() {
            let dst_path = self.published_dir.join(&fresh_name);

            log::debug!(
                "[FragmentConsolidator::consolidate] moving {} to {}",
                fresh_path.display(),
                dst_path.display()
            );

            comm_fs::move_file(&fresh_path, &dst_path)
                .await
                .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

            mlog::session::event(
                "info",
                "published",
                date_key.as_str(),
                json!({ "path": RecPathToString!(dst_path) }),
            );

            return Ok(ConsolidateRst::Published(dst_path));
        }

        //
        // case B: merge existing files + fresh fragment, fresh one last
        //

        let mut inputs = existing;
        inputs.push(fresh_path.to_path_buf());

        log::info!(
            "[FragmentConsolidator::consolidate] found {} video files for date key {}",
            inputs.len(),
            date_key
        );

        self.merge(inputs, date_key).await
    }

    // `{dateKey}-meeting*.{ext}` in the work dir other than `fresh_path`,
    // > empty ones are removed
    async fn leftover_fragments(
        &self,
        fresh_path: &Path,
        date_key: &SessionDateKey,
    ) -> Result<Vec<comm_fs::MatchedFile>, RunnerError> {
        let prefix = format!("{}{}", date_key, FRAGMENT_NAME_TAG);

        let found = comm_fs::find_files_with_prefix(&self.work_dir, &prefix, &self.ext)
            .await
            .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

        let mut leftovers = Vec::with_capacity(found.len());

        for f in found {
            if fresh_path.file_name() == Some(std::ffi::OsStr::new(&f.file_name)) {
                continue;
            }

            if comm_fs::file_size(&f.path).await == Some(0) {
                if let Err(e) = comm_fs::remove_file(&f.path).await {
                    log::error!(
                        "[FragmentConsolidator::leftover_fragments] {}",
                        RunnerError::FragmentCleanupErr(e.to_string())
                    );
                }
                continue;
            }

            log::info!(
                "[FragmentConsolidator::leftover_fragments] retrying unmerged fragment {}",
                f.path.display()
            );

            leftovers.push(f);
        }

        Ok(leftovers)
    }

    async fn merge(
        &self,
        inputs: Vec<PathBuf>,
        date_key: &SessionDateKey,
    ) -> Result<ConsolidateRst, RunnerError> {
        let mut abs_inputs = Vec::with_capacity(inputs.len());

        for input in inputs.iter() {
            let abs = tokio::fs::canonicalize(input).await.map_err(|e| {
                RunnerError::FileOperErr(format!("{}, e={}", input.display(), e))
            })?;

            if !is_manifest_safe(&abs) {
                return Err(RunnerError::ConsolidationMergeErr(format!(
                    "path can't be listed in concat manifest, {}",
                    abs.display()
                )));
            }

            abs_inputs.push(abs);
        }

        //
        // manifest
        //

        let manifest_path = self.work_dir.join(format!("{}_concat.txt", date_key));
        let manifest: String = abs_inputs
            .iter()
            .map(|p| format!("file {}\n", p.display()))
            .collect();

        tokio::fs::write(&manifest_path, manifest)
            .await
            .map_err(|e| {
                RunnerError::FileOperErr(format!("{}, e={}", manifest_path.display(), e))
            })?;

        //
        // output, unique per merge event
        //

        let mut epoch = get_rec_epoch();
        let mut out_path = self
            .published_dir
            .join(merged_file_name(date_key, epoch, &self.ext));

        while comm_fs::file_size(&out_path).await.is_some() {
            epoch += 1;
            out_path = self
                .published_dir
                .join(merged_file_name(date_key, epoch, &self.ext));
        }

        let ffmpeg_log_file_path = self
            .ffmpeg_log_dir
            .as_ref()
            .map(|d| d.join(format!("{}_concat.log", date_key)));

        let merge_rst = match FFMpegCmd::new_as_concat(
            &self.ffmpeg_path,
            &self.ffmpeg_verbose,
            ffmpeg_log_file_path,
            &manifest_path,
            &out_path,
        ) {
            Ok(cmd) => ffmpeg::run_ffmpeg(&cmd)
                .await
                .map_err(|e| RunnerError::ConsolidationMergeErr(e.to_string()))
                .and_then(|exit_rst| {
                    if exit_rst.is_success() {
                        Ok(())
                    } else {
                        Err(RunnerError::ConsolidationMergeErr(format!(
                            "concat exited, exit_code={}, desc={}",
                            exit_rst.exit_code, exit_rst.exit_desc
                        )))
                    }
                }),
            Err(e) => Err(RunnerError::ConsolidationMergeErr(e.to_string())),
        };

        if let Err(e) = comm_fs::remove_file(&manifest_path).await {
            log::debug!("[FragmentConsolidator::merge] manifest not removed, {}", e);
        }

        if let Err(e) = merge_rst {
            log::error!(
                "[FragmentConsolidator::merge] error concatenating video files with date key {}, inputs are kept for retry, e={}",
                date_key,
                e
            );

            if comm_fs::file_size(&out_path).await.is_some() {
                if let Err(rm_err) = comm_fs::remove_file(&out_path).await {
                    log::error!(
                        "[FragmentConsolidator::merge] could not delete incomplete output, {}",
                        rm_err
                    );
                }
            }

            mlog::session::event(
                "err",
                "consolidation_failed",
                date_key.as_str(),
                json!({ "input_cnt": inputs.len(), "e": e.to_string() }),
            );

            return Err(e);
        }

        //
        // merged, the output is now the only published file for these inputs
        //

        let mut cleanup_failed_cnt = 0;

        for input in inputs.iter() {
            if let Err(e) = comm_fs::remove_file(input).await {
                cleanup_failed_cnt += 1;
                log::error!(
                    "[FragmentConsolidator::merge] {}",
                    RunnerError::FragmentCleanupErr(e.to_string())
                );
            }
        }

        mlog::session::event(
            "info",
            "consolidated",
            date_key.as_str(),
            json!({
                "out_path"           : RecPathToString!(out_path),
                "input_cnt"          : inputs.len(),
                "cleanup_failed_cnt" : cleanup_failed_cnt,
            }),
        );

        Ok(ConsolidateRst::Merged {
            out_path,
            input_cnt: inputs.len(),
            cleanup_failed_cnt,
        })
    }
}
