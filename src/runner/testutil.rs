// fake ffmpeg for tests
// > capture: writes "captured:{url};" to the last argument
// > concat: appends every manifest entry into the last argument
// >   (optionally deletes the first entry, leaving the merge to clean up the rest)
// > every call is appended to "{script}.calls"
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct FakeFFMpeg {
    pub capture_exit: i32,
    pub concat_exit: i32,
    // >0: capture keeps running for this many seconds
    pub capture_sleep_sec: u32,
    // concat deletes its first input before exiting
    pub concat_remove_first_input: bool,
}

impl Default for FakeFFMpeg {
    fn default() -> Self {
        Self {
            capture_exit: 0,
            concat_exit: 0,
            capture_sleep_sec: 0,
            concat_remove_first_input: false,
        }
    }
}

impl FakeFFMpeg {
    pub fn install(&self, dir: &Path) -> PathBuf {
        let capture_tail = if self.capture_sleep_sec > 0 {
            format!("exec sleep {}", self.capture_sleep_sec)
        } else {
            format!("exit {}", self.capture_exit)
        };

        let script = format!(
            r#"#!/bin/sh
echo "$*" >> "$0.calls"
prev=""
concat=0
input=""
last=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then input="$a"; fi
  if [ "$prev" = "-f" ] && [ "$a" = "concat" ]; then concat=1; fi
  prev="$a"
  last="$a"
done
if [ "$concat" = "1" ]; then
  : > "$last"
  first=""
  while read -r kw path; do
    cat "$path" >> "$last"
    if [ -z "$first" ]; then first="$path"; fi
  done < "$input"
  if [ "{remove_first}" = "1" ]; then rm -f "$first"; fi
  exit {concat_exit}
fi
printf 'captured:%s;' "$input" > "$last"
{capture_tail}
"#,
            concat_exit = self.concat_exit,
            remove_first = if self.concat_remove_first_input { 1 } else { 0 },
            capture_tail = capture_tail,
        );

        let path = dir.join("fake-ffmpeg.sh");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        path
    }
}

pub fn fake_ffmpeg_calls(script: &Path) -> Vec<String> {
    let calls = PathBuf::from(format!("{}.calls", script.display()));

    match std::fs::read_to_string(calls) {
        Ok(s) => s.lines().map(|l| l.to_string()).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
