//! In-process stand-in for the media engine used by pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{FilterJob, FrameRequest, MediaEngine};
use crate::error::{Result, TranscodeError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Probe(PathBuf),
    Filter(FilterJob),
    Frames(FrameRequest),
}

/// Writes placeholder files instead of media and records every call
#[derive(Debug)]
pub(crate) struct FakeEngine {
    pub duration: Option<f64>,
    pub fail_probe: bool,
    pub fail_check: bool,
    /// Filter jobs whose output path contains this fragment fail
    pub fail_filter_matching: Option<String>,
    pub filter_delay: Duration,
    pub(crate) calls: Mutex<Vec<Call>>,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) peak: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            duration: Some(10.0),
            fail_probe: false,
            fail_check: false,
            fail_filter_matching: None,
            filter_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn frame_requests(&self) -> Vec<FrameRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Frames(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn filter_jobs(&self) -> Vec<FilterJob> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Filter(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    /// Highest number of filter/frame calls observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn check(&self) -> Result<()> {
        if self.fail_check {
            return Err(TranscodeError::MissingDependency("ffmpeg".to_string()));
        }
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>> {
        self.record(Call::Probe(input.to_path_buf()));
        if self.fail_probe {
            return Err(TranscodeError::probe(input, "moov atom not found"));
        }
        Ok(self.duration)
    }

    async fn apply_filter(&self, job: &FilterJob) -> Result<()> {
        self.record(Call::Filter(job.clone()));
        self.enter();
        tokio::time::sleep(self.filter_delay).await;
        self.leave();

        if let Some(fragment) = &self.fail_filter_matching {
            if job.output.to_string_lossy().contains(fragment.as_str()) {
                return Err(TranscodeError::engine("ffmpeg", "Conversion failed!"));
            }
        }
        tokio::fs::write(&job.output, b"fake media").await?;
        Ok(())
    }

    async fn extract_frames(&self, request: &FrameRequest) -> Result<Vec<PathBuf>> {
        self.record(Call::Frames(request.clone()));
        self.enter();
        tokio::task::yield_now().await;
        self.leave();

        let outputs = request.output_paths();
        for output in &outputs {
            tokio::fs::write(output, b"fake frame").await?;
        }
        Ok(outputs)
    }
}
