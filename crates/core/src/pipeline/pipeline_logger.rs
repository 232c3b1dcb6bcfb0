use std::time::{Duration, Instant};

use super::capture_faces_use_case::CaptureReport;

/// Per-frame stages the capture loop times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Detect,
    /// Crop, classify, log and annotate the faces of a committed frame.
    Classify,
    /// Recording plus live view.
    Record,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Detect, Stage::Classify, Stage::Record];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Detect => "detect",
            Stage::Classify => "classify",
            Stage::Record => "record",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Observer of the capture loop.
pub trait PipelineLogger: Send {
    /// Called after every captured frame with the running frame count and
    /// the number of faces detected on that frame.
    fn frame(&mut self, frames: usize, faces: usize);

    fn timing(&mut self, stage: Stage, elapsed: Duration);

    fn info(&mut self, message: &str);

    /// Called once when the loop stops, with the session's counters.
    fn finish(&mut self, _report: &CaptureReport) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _frames: usize, _faces: usize) {}
    fn timing(&mut self, _stage: Stage, _elapsed: Duration) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StageStats {
    runs: usize,
    total: Duration,
    max: Duration,
}

impl StageStats {
    fn add(&mut self, elapsed: Duration) {
        self.runs += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    fn mean(&self) -> Duration {
        if self.runs == 0 {
            return Duration::ZERO;
        }
        self.total / u32::try_from(self.runs).unwrap_or(u32::MAX)
    }
}

/// Logs capture progress through `log` and prints a session summary.
///
/// Only running aggregates are kept, so memory stays flat however long the
/// camera runs.
pub struct StdoutPipelineLogger {
    progress_every: usize,
    started: Instant,
    frames_with_faces: usize,
    most_faces: usize,
    stages: [StageStats; 3],
}

impl StdoutPipelineLogger {
    /// Logs a progress line once every `progress_every` frames.
    pub fn new(progress_every: usize) -> Self {
        Self {
            progress_every: progress_every.max(1),
            started: Instant::now(),
            frames_with_faces: 0,
            most_faces: 0,
            stages: [StageStats::default(); 3],
        }
    }

    /// Session summary for a run that lasted `elapsed`.
    pub fn summary_string(&self, report: &CaptureReport, elapsed: Duration) -> String {
        let secs = elapsed.as_secs_f64();
        let mut lines = Vec::new();

        let mut head = format!("Capture summary: {} frames in {secs:.1}s", report.frames);
        if report.frames > 0 && secs > 0.0 {
            head.push_str(&format!(" ({:.1} fps)", report.frames as f64 / secs));
        }
        lines.push(head);

        if self.frames_with_faces > 0 {
            lines.push(format!(
                "  faces on {} frames, at most {} at once",
                self.frames_with_faces, self.most_faces
            ));
        } else {
            lines.push("  no faces seen".to_string());
        }
        lines.push(format!(
            "  {} commits, {} records written",
            report.commits, report.records_written
        ));

        let dropped =
            report.faces_skipped + report.classification_failures + report.log_failures;
        if dropped > 0 {
            lines.push(format!(
                "  dropped: {} too small, {} unclassified, {} not logged",
                report.faces_skipped, report.classification_failures, report.log_failures
            ));
        }

        for stage in Stage::ALL {
            let stats = &self.stages[stage.index()];
            if stats.runs == 0 {
                continue;
            }
            lines.push(format!(
                "  {:<8} avg {:6.1}ms  max {:6.1}ms  ({} runs)",
                stage.label(),
                stats.mean().as_secs_f64() * 1000.0,
                stats.max.as_secs_f64() * 1000.0,
                stats.runs
            ));
        }

        lines.join("\n")
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, frames: usize, faces: usize) {
        if faces > 0 {
            self.frames_with_faces += 1;
            self.most_faces = self.most_faces.max(faces);
        }
        if frames % self.progress_every == 0 {
            log::info!(
                "Captured {frames} frames ({} with faces) in {:.0}s",
                self.frames_with_faces,
                self.started.elapsed().as_secs_f64()
            );
        }
    }

    fn timing(&mut self, stage: Stage, elapsed: Duration) {
        self.stages[stage.index()].add(elapsed);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn finish(&mut self, report: &CaptureReport) {
        log::info!("\n{}", self.summary_string(report, self.started.elapsed()));
    }
}
