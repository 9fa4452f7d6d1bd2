use std::fmt::Display;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::info;
use readdb::fastq::reader::decompressing_reader;

pub fn input_stream(path: &str) -> Result<InputStream, String> {
    let input_path = Path::new(path);
    let result = InputStream {
        path: input_path.to_path_buf(),
    };

    Ok(result)
}

#[derive(Debug, Clone)]
pub struct InputStream {
    path: PathBuf,
}

impl Display for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl Default for InputStream {
    fn default() -> Self {
        Self {
            path: PathBuf::from("-"),
        }
    }
}

impl InputStream {
    pub fn as_reader(&self) -> anyhow::Result<InputReader> {
        InputReader::from_path(&self.path)
    }
}

#[derive(Debug)]
pub enum InputReader {
    Stdin(io::Stdin),
    File { file: File, path: PathBuf },
}

impl InputReader {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        let is_stdin = path.to_string_lossy() == "-";

        let val = if is_stdin {
            info!("Input file: standard input");
            Self::Stdin(io::stdin())
        } else {
            info!("Input file: {}", path.display());
            let file = File::open(path)?;

            Self::File {
                file,
                path: path.to_owned(),
            }
        };
        Ok(val)
    }

    /// Size of the input in bytes, if known up front.
    pub fn length(&self) -> anyhow::Result<Option<u64>> {
        let val = match self {
            InputReader::Stdin(_) => None,
            InputReader::File { file, .. } => Some(file.metadata()?.len()),
        };
        Ok(val)
    }

    /// Buffered reader over the input, transparently decoding gzip.
    pub fn into_buf_read(self) -> io::Result<Box<dyn BufRead>> {
        match self {
            InputReader::Stdin(stdin) => decompressing_reader(BufReader::new(stdin)),
            InputReader::File { file, .. } => decompressing_reader(BufReader::new(file)),
        }
    }
}

#[derive(Debug)]
pub enum OutputWriter {
    Stdout(io::Stdout),
    File(File),
}

impl OutputWriter {
    pub fn from_path(output: &Option<PathBuf>) -> anyhow::Result<Self> {
        let path = output.clone().unwrap_or_else(|| PathBuf::from("-"));
        let is_stdout = path.to_string_lossy() == "-";

        let writer = if is_stdout {
            Self::Stdout(io::stdout())
        } else {
            info!("Output file: {}", path.display());
            let file = File::create(&path)?;
            Self::File(file)
        };

        Ok(writer)
    }

    pub fn into_write(self) -> Box<dyn Write> {
        match self {
            OutputWriter::Stdout(stdout) => Box::new(io::BufWriter::new(stdout)),
            OutputWriter::File(file) => Box::new(io::BufWriter::new(file)),
        }
    }
}
