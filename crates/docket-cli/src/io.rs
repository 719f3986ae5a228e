//! # Input and Output
//!
//! Every document subcommand takes `[infile] [outfile]`. A missing input
//! or `-` reads stdin; a missing output or `-` writes stdout. Output files
//! are created exclusively unless `--force` is set. `--in-place` writes
//! the result back over the input file and cannot be used with stdin.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use crate::GlobalOpts;

/// Positional input and output paths.
#[derive(Args, Debug, Default, Clone)]
pub struct Files {
    /// Input file, `-` or absent for stdin.
    pub infile: Option<PathBuf>,
    /// Output file, `-` or absent for stdout.
    pub outfile: Option<PathBuf>,
}

fn named(path: Option<&PathBuf>) -> Option<&Path> {
    path.map(PathBuf::as_path).filter(|p| *p != Path::new("-"))
}

impl Files {
    pub fn input_path(&self) -> Option<&Path> {
        named(self.infile.as_ref())
    }

    /// Read the whole input.
    pub fn read(&self, stdin: &mut dyn Read) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        match self.input_path() {
            Some(path) => {
                data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            }
            None => {
                stdin.read_to_end(&mut data).context("reading stdin")?;
            }
        }
        Ok(data)
    }

    /// Where the result goes.
    pub fn output(&self, opts: &GlobalOpts) -> Result<Output> {
        if opts.in_place {
            return match self.input_path() {
                Some(path) => Ok(Output::File {
                    path: path.to_path_buf(),
                    overwrite: true,
                }),
                None => bail!("cannot overwrite STDIN"),
            };
        }
        Ok(match named(self.outfile.as_ref()) {
            Some(path) => Output::File {
                path: path.to_path_buf(),
                overwrite: opts.force,
            },
            None => Output::Stdout,
        })
    }
}

/// Resolved output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File { path: PathBuf, overwrite: bool },
}

impl Output {
    pub fn write(&self, data: &[u8], stdout: &mut dyn Write) -> Result<()> {
        match self {
            Self::Stdout => {
                stdout.write_all(data).context("writing stdout")?;
                stdout.flush().context("writing stdout")?;
            }
            Self::File { path, overwrite } => {
                let mut open = OpenOptions::new();
                open.write(true);
                if *overwrite {
                    open.create(true).truncate(true);
                } else {
                    open.create_new(true);
                }
                let mut file = open
                    .open(path)
                    .with_context(|| format!("opening {}", path.display()))?;
                file.write_all(data)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
        }
        Ok(())
    }
}

/// JSON with a trailing newline, pretty when `indent` is set.
pub fn encode<T: Serialize>(value: &T, indent: bool) -> Result<Vec<u8>> {
    let mut out = if indent {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(infile: Option<&Path>, outfile: Option<&Path>) -> Files {
        Files {
            infile: infile.map(Path::to_path_buf),
            outfile: outfile.map(Path::to_path_buf),
        }
    }

    #[test]
    fn dash_means_standard_streams() {
        let f = files(Some(Path::new("-")), Some(Path::new("-")));
        assert!(f.input_path().is_none());
        assert_eq!(f.output(&GlobalOpts::default()).unwrap(), Output::Stdout);

        let mut stdin: &[u8] = b"from stdin";
        assert_eq!(f.read(&mut stdin).unwrap(), b"from stdin");
    }

    #[test]
    fn in_place_needs_a_file() {
        let opts = GlobalOpts {
            in_place: true,
            ..Default::default()
        };
        let err = files(None, None).output(&opts).unwrap_err();
        assert_eq!(err.to_string(), "cannot overwrite STDIN");

        let out = files(Some(Path::new("doc.json")), Some(Path::new("other.json")))
            .output(&opts)
            .unwrap();
        assert_eq!(
            out,
            Output::File {
                path: PathBuf::from("doc.json"),
                overwrite: true
            }
        );
    }

    #[test]
    fn existing_output_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "old").unwrap();
        let f = files(None, Some(&path));

        let out = f.output(&GlobalOpts::default()).unwrap();
        assert!(out.write(b"new", &mut std::io::sink()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");

        let forced = GlobalOpts {
            force: true,
            ..Default::default()
        };
        f.output(&forced).unwrap().write(b"new", &mut std::io::sink()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn encode_appends_newline() {
        let out = encode(&serde_json::json!({"a": 1}), false).unwrap();
        assert_eq!(out, b"{\"a\":1}\n");
        let out = encode(&serde_json::json!({"a": 1}), true).unwrap();
        assert_eq!(out, b"{\n  \"a\": 1\n}\n");
    }
}
