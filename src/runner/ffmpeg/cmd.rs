use super::RunnerFFMError;
use std::path::{Path, PathBuf};

/*
    capture (stream copy, no re-encode)
    $ ffmpeg -nostdin -y -v warning \
        -i http://x/stream.m3u8 \
        -c copy \
        /tmp/..streamRecorder/01-02-2024-meeting.mp4

    concat (stream copy over a manifest of `file <path>` lines)
    $ ffmpeg -nostdin -y -v warning \
        -f concat -safe 0 \
        -i /tmp/..streamRecorder/01-02-2024_concat.txt \
        -c copy \
        static/recordings/01-02-2024_1704200000.mp4
*/

pub type FFMpegArgs = Vec<String>;

#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FFMpegCmdType {
    // CAPTURE("hls")
    CAPTURE(&'static str),

    // CONCAT("manifest")
    CONCAT(&'static str),
}

#[derive(Debug, Clone)]
pub struct FFMpegCmd {
    cmd_type: FFMpegCmdType,

    out_path: PathBuf,

    ffmpeg_path: String,
    ffmpeg_args: FFMpegArgs,

    ffmpeg_log_file_path: Option<PathBuf>,
}

fn common_args(ffmpeg_verbose: &str) -> FFMpegArgs {
    let mut args = FFMpegArgs::new();

    // never read the terminal, runs headless
    args.push("-nostdin".to_string());
    // -y: overwriting
    args.push("-y".to_string());
    // -v : quiet | panic | fatal | error | warning | info | verbose | debug | trace
    args.push("-v".to_string());
    args.push(ffmpeg_verbose.to_string());

    args
}

fn path_arg(path: &Path) -> Result<String, RunnerFFMError> {
    path.to_str().map(|s| s.to_string()).ok_or_else(|| {
        RunnerFFMError::InvalidCmdGenParameter(format!(
            "path is not valid utf-8, {}",
            path.display()
        ))
    })
}

impl FFMpegCmd {
    pub fn new_as_stream_capture(
        ffmpeg_path: &str,
        ffmpeg_verbose: &str,
        ffmpeg_log_file_path: Option<PathBuf>,
        source_url: &str,
        dest_path: &Path,
    ) -> Result<Self, RunnerFFMError> {
        if source_url.is_empty() {
            return Err(RunnerFFMError::InvalidCmdGenParameter(
                "source url is empty".to_string(),
            ));
        }

        let mut args = common_args(ffmpeg_verbose);

        args.push("-i".to_string());
        args.push(source_url.to_string());
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.push(path_arg(dest_path)?);

        Ok(Self {
            cmd_type: FFMpegCmdType::CAPTURE("hls"),
            out_path: dest_path.to_path_buf(),
            ffmpeg_path: ffmpeg_path.to_string(),
            ffmpeg_args: args,
            ffmpeg_log_file_path,
        })
    }

    pub fn new_as_concat(
        ffmpeg_path: &str,
        ffmpeg_verbose: &str,
        ffmpeg_log_file_path: Option<PathBuf>,
        manifest_path: &Path,
        out_path: &Path,
    ) -> Result<Self, RunnerFFMError> {
        let mut args = common_args(ffmpeg_verbose);

        // keep order, -f/-safe apply to the following input
        args.push("-f".to_string());
        args.push("concat".to_string());
        // absolute paths in the manifest
        args.push("-safe".to_string());
        args.push("0".to_string());
        args.push("-i".to_string());
        args.push(path_arg(manifest_path)?);
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.push(path_arg(out_path)?);

        Ok(Self {
            cmd_type: FFMpegCmdType::CONCAT("manifest"),
            out_path: out_path.to_path_buf(),
            ffmpeg_path: ffmpeg_path.to_string(),
            ffmpeg_args: args,
            ffmpeg_log_file_path,
        })
    }

    pub fn get_cmd_type(&self) -> FFMpegCmdType {
        self.cmd_type
    }

    pub fn get_program(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn get_ffmpeg_args(&self) -> &FFMpegArgs {
        &self.ffmpeg_args
    }

    pub fn args_to_string(&self) -> String {
        self.ffmpeg_args.join(" ")
    }

    pub fn get_out_path(&self) -> &Path {
        &self.out_path
    }

    pub fn get_ffmpeg_log_file_path(&self) -> Option<&Path> {
        self.ffmpeg_log_file_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_args_are_an_argument_vector() {
        let cmd = FFMpegCmd::new_as_stream_capture(
            "/usr/bin/ffmpeg",
            "warning",
            None,
            "http://x/stream.m3u8",
            Path::new("/tmp/work dir/01-02-2024-meeting.mp4"),
        )
        .unwrap();

        assert_eq!(cmd.get_cmd_type(), FFMpegCmdType::CAPTURE("hls"));
        assert_eq!(
            cmd.get_ffmpeg_args(),
            &vec![
                "-nostdin",
                "-y",
                "-v",
                "warning",
                "-i",
                "http://x/stream.m3u8",
                "-c",
                "copy",
                "/tmp/work dir/01-02-2024-meeting.mp4",
            ]
        );
    }

    #[test]
    fn concat_args_put_format_before_input() {
        let cmd = FFMpegCmd::new_as_concat(
            "ffmpeg",
            "error",
            None,
            Path::new("/w/01-02-2024_concat.txt"),
            Path::new("/pub/01-02-2024_1.mp4"),
        )
        .unwrap();

        let args = cmd.get_ffmpeg_args();
        let pos_f = args.iter().position(|a| a == "-f").unwrap();
        let pos_i = args.iter().position(|a| a == "-i").unwrap();

        assert!(pos_f < pos_i);
        assert_eq!(args[pos_f + 1], "concat");
        assert_eq!(args[pos_i + 1], "/w/01-02-2024_concat.txt");
        assert_eq!(args.last().unwrap(), "/pub/01-02-2024_1.mp4");
        assert_eq!(cmd.get_out_path(), Path::new("/pub/01-02-2024_1.mp4"));
    }

    #[test]
    fn capture_rejects_empty_url() {
        assert!(FFMpegCmd::new_as_stream_capture(
            "ffmpeg",
            "warning",
            None,
            "",
            Path::new("/tmp/a.mp4")
        )
        .is_err());
    }
}
