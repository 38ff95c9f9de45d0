//! Streaming destination for one page body.
//!
//! The output file is only created once the final response is known to be a
//! 200, so 404 and error responses never leave files behind. Bodies of error
//! responses are kept (truncated) for the log.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use super::head::ResponseHead;
use crate::job::Job;

/// How much of an error body is kept for logging.
const ERROR_BODY_LIMIT: usize = 1024;

pub(crate) struct PageSink<'a> {
    job: &'a Job,
    file: Option<(PathBuf, BufWriter<File>)>,
    bytes: u64,
    error_body: Vec<u8>,
}

impl<'a> PageSink<'a> {
    pub(crate) fn new(job: &'a Job) -> Self {
        Self {
            job,
            file: None,
            bytes: 0,
            error_body: Vec::new(),
        }
    }

    /// Handle one body chunk of the response described by `head`.
    pub(crate) fn write(&mut self, head: &ResponseHead, data: &[u8]) -> io::Result<()> {
        if !head.is_ok() {
            let room = ERROR_BODY_LIMIT.saturating_sub(self.error_body.len());
            self.error_body.extend_from_slice(&data[..data.len().min(room)]);
            return Ok(());
        }
        if self.file.is_none() {
            let opened = self.open(head)?;
            self.file = Some(opened);
        }
        if let Some((_, writer)) = self.file.as_mut() {
            writer.write_all(data)?;
            self.bytes += data.len() as u64;
        }
        Ok(())
    }

    /// Flush and close. Creates an empty file for a 200 with no body.
    pub(crate) fn finish(mut self, head: &ResponseHead) -> io::Result<(PathBuf, u64)> {
        let (path, mut writer) = match self.file.take() {
            Some(f) => f,
            None => self.open(head)?,
        };
        writer.flush()?;
        Ok((path, self.bytes))
    }

    pub(crate) fn error_body(&self) -> String {
        String::from_utf8_lossy(&self.error_body).trim().to_string()
    }

    fn open(&self, head: &ResponseHead) -> io::Result<(PathBuf, BufWriter<File>)> {
        let keep_gzip = self.job.template().output.gzipped && head.is_gzip();
        let path = self.job.output_path(keep_gzip);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(&path)?;
        tracing::debug!(page = self.job.page(), path = %path.display(), "writing page");
        Ok((path, BufWriter::new(file)))
    }
}
