use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::annotation::frame_annotator::{FaceAnnotation, FrameAnnotator};
use crate::classification::domain::demographics::{AgeBucket, Gender};
use crate::classification::domain::face_classifier::{AgeClassifier, GenderClassifier};
use crate::classification::domain::face_crop;
use crate::detection::domain::face_detector::FaceDetector;
use crate::prediction_log::domain::prediction_log::PredictionLog;
use crate::prediction_log::domain::prediction_record::PredictionRecord;
use crate::shared::clock::Clock;
use crate::shared::constants::{CLASSIFIER_INPUT_SIZE, DEBOUNCE_SECONDS, MIN_FACE_SIZE};
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::video::domain::capture_source::CaptureSource;
use crate::video::domain::live_view::LiveView;
use crate::video::domain::video_writer::VideoWriter;

use super::detection_session::DetectionSession;
use super::pipeline_logger::{PipelineLogger, Stage};

const DEFAULT_MAX_READ_RETRIES: u32 = 3;

/// Fatal capture failures. Everything else is logged and skipped.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot open capture source: {0}")]
    Open(String),
    #[error("capture source failed {attempts} times in a row: {message}")]
    Read { attempts: u32, message: String },
    #[error("cannot write recording: {0}")]
    Sink(String),
}

/// Tunables of the capture loop.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    /// Seconds a face must stay in view before frames are committed.
    pub debounce_seconds: f64,
    /// Crops narrower or shorter than this many pixels are not classified.
    pub min_face_size: u32,
    /// Side length of the square classifier input.
    pub crop_size: u32,
    /// Consecutive read errors tolerated before giving up.
    pub max_read_retries: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: DEBOUNCE_SECONDS,
            min_face_size: MIN_FACE_SIZE,
            crop_size: CLASSIFIER_INPUT_SIZE,
            max_read_retries: DEFAULT_MAX_READ_RETRIES,
        }
    }
}

/// Counters for a finished capture session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureReport {
    pub frames: usize,
    /// Frames on which the debounced faces were classified.
    pub commits: usize,
    pub records_written: usize,
    /// Detections too small (or off-frame) to classify.
    pub faces_skipped: usize,
    pub classification_failures: usize,
    pub log_failures: usize,
}

/// Captures frames, debounces face detections, classifies committed faces
/// and logs the predictions, while recording the annotated stream.
///
/// The source is always closed and the recording always finalized when
/// `execute` returns, whichever way it returns.
pub struct CaptureFacesUseCase {
    source: Box<dyn CaptureSource>,
    detector: Box<dyn FaceDetector>,
    age_classifier: Box<AgeClassifier>,
    gender_classifier: Box<GenderClassifier>,
    log: Box<dyn PredictionLog>,
    writer: Box<dyn VideoWriter>,
    live_view: Option<Box<dyn LiveView>>,
    annotator: FrameAnnotator,
    clock: Box<dyn Clock>,
    logger: Box<dyn PipelineLogger>,
    config: CaptureConfig,
    cancelled: Arc<AtomicBool>,
}

impl CaptureFacesUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn CaptureSource>,
        detector: Box<dyn FaceDetector>,
        age_classifier: Box<AgeClassifier>,
        gender_classifier: Box<GenderClassifier>,
        log: Box<dyn PredictionLog>,
        writer: Box<dyn VideoWriter>,
        clock: Box<dyn Clock>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            age_classifier,
            gender_classifier,
            log,
            writer,
            live_view: None,
            annotator: FrameAnnotator::new(),
            clock,
            logger,
            config: CaptureConfig::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_live_view(mut self, live_view: Box<dyn LiveView>) -> Self {
        self.live_view = Some(live_view);
        self
    }

    pub fn with_annotator(mut self, annotator: FrameAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Shares a stop flag; the loop exits cleanly at the next frame once
    /// it is set.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Runs the capture loop until the source is exhausted, cancellation is
    /// requested, or a fatal error occurs.
    pub fn execute(&mut self, recording_path: &Path) -> Result<CaptureReport, CaptureError> {
        let metadata = match self.source.open() {
            Ok(metadata) => metadata,
            Err(e) => {
                self.source.close();
                return Err(CaptureError::Open(e.to_string()));
            }
        };

        if let Err(e) = self.writer.open(recording_path, &metadata) {
            self.source.close();
            return Err(CaptureError::Sink(e.to_string()));
        }

        self.logger.info(&format!(
            "Capturing {}x{} from {}",
            metadata.width,
            metadata.height,
            metadata.source.as_deref().unwrap_or("capture source")
        ));

        let mut report = CaptureReport::default();
        let outcome = self.run(&mut report);

        self.source.close();
        let finalized = self.writer.close();
        self.logger.finish(&report);

        outcome?;
        finalized.map_err(|e| CaptureError::Sink(e.to_string()))?;
        Ok(report)
    }

    fn run(&mut self, report: &mut CaptureReport) -> Result<(), CaptureError> {
        let mut session = DetectionSession::from_seconds(self.config.debounce_seconds);
        let mut read_failures = 0;

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Capture cancelled");
                return Ok(());
            }

            let mut frame = match self.source.read() {
                Ok(Some(frame)) => {
                    read_failures = 0;
                    frame
                }
                Ok(None) => {
                    self.logger.info("Capture source exhausted");
                    return Ok(());
                }
                Err(e) => {
                    read_failures += 1;
                    if read_failures > self.config.max_read_retries {
                        return Err(CaptureError::Read {
                            attempts: read_failures,
                            message: e.to_string(),
                        });
                    }
                    log::warn!("Frame read failed ({read_failures}): {e}");
                    continue;
                }
            };
            report.frames += 1;
            let now = self.clock.now();

            let t0 = Instant::now();
            let detected = self.detector.detect(&frame);
            self.logger.timing(Stage::Detect, t0.elapsed());

            let mut faces_in_frame = 0;
            match detected {
                Ok(regions) => {
                    faces_in_frame = regions.len();
                    if session.observe(now, regions.len()) {
                        report.commits += 1;
                        let t0 = Instant::now();
                        let faces = self.commit(&frame, &regions, now, report);
                        self.annotator.annotate(&mut frame, &faces);
                        self.logger.timing(Stage::Classify, t0.elapsed());
                    }
                }
                Err(e) => log::warn!("Face detection failed on frame {}: {e}", frame.index()),
            }

            let t0 = Instant::now();
            self.writer
                .write(&frame)
                .map_err(|e| CaptureError::Sink(e.to_string()))?;
            if let Some(view) = self.live_view.as_mut() {
                if let Err(e) = view.show(&frame) {
                    log::warn!("Live view update failed: {e}");
                }
            }
            self.logger.timing(Stage::Record, t0.elapsed());

            self.logger.frame(report.frames, faces_in_frame);
        }
    }

    /// Classifies and logs every face of a committed frame. Returns the
    /// faces to draw.
    fn commit(
        &mut self,
        frame: &Frame,
        regions: &[Region],
        now: NaiveDateTime,
        report: &mut CaptureReport,
    ) -> Vec<FaceAnnotation> {
        let mut faces = Vec::with_capacity(regions.len());

        for region in regions {
            let Some(crop) = face_crop::extract(frame, region, self.config.min_face_size) else {
                report.faces_skipped += 1;
                continue;
            };

            let (age, gender) = match self.classify(&crop) {
                Ok(labels) => labels,
                Err(e) => {
                    log::warn!("Skipping face on frame {}: {e}", frame.index());
                    report.classification_failures += 1;
                    continue;
                }
            };

            let record = PredictionRecord::new(now, age, gender);
            match self.log.append(&record) {
                Ok(file) => {
                    report.records_written += 1;
                    log::debug!("Logged {age}, {gender} to {}", file.path.display());
                }
                Err(e) => {
                    report.log_failures += 1;
                    log::warn!("Dropping prediction: {e}");
                }
            }

            faces.push(FaceAnnotation {
                region: region.clone(),
                age,
                gender,
            });
        }

        faces
    }

    fn classify(&mut self, crop: &Frame) -> Result<(AgeBucket, Gender), Box<dyn std::error::Error>> {
        let input = face_crop::normalize(crop, self.config.crop_size)?;
        let gender = Gender::from_scores(&self.gender_classifier.classify(&input)?);
        let age = AgeBucket::from_scores(&self.age_classifier.classify(&input)?);
        Ok((age, gender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Duration, NaiveDate};
    use ndarray::Array4;

    use crate::classification::domain::categorical_scores::CategoricalScores;
    use crate::classification::domain::face_classifier::FaceClassifier;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use std::time::Duration as StdDuration;
    use crate::prediction_log::domain::prediction_log::{LogFile, LogStoreError};
    use crate::shared::clock::ManualClock;
    use crate::shared::video_metadata::VideoMetadata;

    const W: u32 = 64;
    const H: u32 = 64;

    fn t(secs: f64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::milliseconds((secs * 1000.0) as i64)
    }

    fn face() -> Region {
        Region::new(10, 10, 20, 20, 0.9)
    }

    // --- Stubs ---

    enum Step {
        Frame(f64),
        Fail,
    }

    /// Replays a script of reads, moving the shared clock to each frame's
    /// capture time.
    struct StubSource {
        steps: Vec<Step>,
        next: usize,
        frame_index: usize,
        clock: ManualClock,
        fail_open: bool,
        closed: Arc<Mutex<usize>>,
    }

    impl CaptureSource for StubSource {
        fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("no camera".into());
            }
            Ok(VideoMetadata::new(W, H, 20.0))
        }

        fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            let Some(step) = self.steps.get(self.next) else {
                return Ok(None);
            };
            self.next += 1;
            match step {
                Step::Frame(secs) => {
                    self.clock.set(t(*secs));
                    let frame = Frame::blank(W, H, self.frame_index);
                    self.frame_index += 1;
                    Ok(Some(frame))
                }
                Step::Fail => Err("device hiccup".into()),
            }
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    /// Returns the regions configured for each frame index; `None` entries
    /// simulate a detector failure.
    struct StubDetector {
        results: HashMap<usize, Option<Vec<Region>>>,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            if let Some((after, flag)) = &self.cancel_after {
                if frame.index() + 1 >= *after {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            match self.results.get(&frame.index()) {
                Some(Some(regions)) => Ok(regions.clone()),
                Some(None) => Err("inference failed".into()),
                None => Ok(Vec::new()),
            }
        }
    }

    struct StubClassifier<const N: usize> {
        scores: Option<[f32; N]>,
        calls: Arc<Mutex<usize>>,
    }

    impl<const N: usize> FaceClassifier<N> for StubClassifier<N> {
        fn classify(
            &mut self,
            face: &Array4<f32>,
        ) -> Result<CategoricalScores<N>, Box<dyn std::error::Error>> {
            assert_eq!(face.shape(), &[1, 96, 96, 3]);
            *self.calls.lock().unwrap() += 1;
            match self.scores {
                Some(scores) => Ok(CategoricalScores::new(scores)?),
                None => Err("model failed".into()),
            }
        }
    }

    struct StubLog {
        records: Arc<Mutex<Vec<PredictionRecord>>>,
        fail: bool,
    }

    impl PredictionLog for StubLog {
        fn append(&mut self, record: &PredictionRecord) -> Result<LogFile, LogStoreError> {
            if self.fail {
                return Err(LogStoreError::Io {
                    path: "predictions.csv".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(LogFile {
                path: "predictions.csv".into(),
                date: record.timestamp.date(),
            })
        }
    }

    #[derive(Default)]
    struct WriterLog {
        opened: bool,
        frames: Vec<Frame>,
        closed: usize,
    }

    struct StubWriter {
        log: Arc<Mutex<WriterLog>>,
        fail_write: bool,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().opened = true;
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_write {
                return Err("disk full".into());
            }
            self.log.lock().unwrap().frames.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    struct StubLiveView {
        shown: Arc<Mutex<usize>>,
    }

    impl LiveView for StubLiveView {
        fn show(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            *self.shown.lock().unwrap() += 1;
            Err("window closed".into())
        }
    }

    #[derive(Default)]
    struct LoggerEvents {
        faces_per_frame: Vec<usize>,
        timed: Vec<Stage>,
        finished: Option<CaptureReport>,
    }

    struct StubLogger {
        events: Arc<Mutex<LoggerEvents>>,
    }

    impl PipelineLogger for StubLogger {
        fn frame(&mut self, frames: usize, faces: usize) {
            let mut events = self.events.lock().unwrap();
            assert_eq!(events.faces_per_frame.len() + 1, frames);
            events.faces_per_frame.push(faces);
        }

        fn timing(&mut self, stage: Stage, _elapsed: StdDuration) {
            self.events.lock().unwrap().timed.push(stage);
        }

        fn info(&mut self, _message: &str) {}

        fn finish(&mut self, report: &CaptureReport) {
            self.events.lock().unwrap().finished = Some(report.clone());
        }
    }

    // --- Harness ---

    const WOMAN: [f32; 2] = [0.2, 0.8];
    const AGE_26_35: [f32; 8] = [0.0, 0.1, 0.6, 0.1, 0.1, 0.1, 0.0, 0.0];

    struct Harness {
        steps: Vec<Step>,
        detections: HashMap<usize, Option<Vec<Region>>>,
        age_scores: Option<[f32; 8]>,
        gender_scores: Option<[f32; 2]>,
        fail_open: bool,
        fail_log: bool,
        fail_write: bool,
        config: CaptureConfig,
        cancel_after: Option<usize>,
        live_view: bool,
        logger_events: Option<Arc<Mutex<LoggerEvents>>>,
    }

    struct Outcome {
        result: Result<CaptureReport, CaptureError>,
        records: Vec<PredictionRecord>,
        writer: Arc<Mutex<WriterLog>>,
        source_closed: usize,
        classifier_calls: usize,
        shown: usize,
    }

    impl Harness {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                detections: HashMap::new(),
                age_scores: Some(AGE_26_35),
                gender_scores: Some(WOMAN),
                fail_open: false,
                fail_log: false,
                fail_write: false,
                config: CaptureConfig::default(),
                cancel_after: None,
                live_view: false,
                logger_events: None,
            }
        }

        /// One frame per capture time.
        fn frames_at(times: &[f64]) -> Self {
            Self::new(times.iter().map(|&s| Step::Frame(s)).collect())
        }

        fn faces_on(mut self, frames: impl IntoIterator<Item = usize>, regions: Vec<Region>) -> Self {
            for i in frames {
                self.detections.insert(i, Some(regions.clone()));
            }
            self
        }

        fn run(self) -> Outcome {
            let clock = ManualClock::new(t(0.0));
            let closed = Arc::new(Mutex::new(0));
            let records = Arc::new(Mutex::new(Vec::new()));
            let writer_log = Arc::new(Mutex::new(WriterLog::default()));
            let calls = Arc::new(Mutex::new(0));
            let shown = Arc::new(Mutex::new(0));
            let cancelled = Arc::new(AtomicBool::new(false));

            let mut use_case = CaptureFacesUseCase::new(
                Box::new(StubSource {
                    steps: self.steps,
                    next: 0,
                    frame_index: 0,
                    clock: clock.clone(),
                    fail_open: self.fail_open,
                    closed: closed.clone(),
                }),
                Box::new(StubDetector {
                    results: self.detections,
                    cancel_after: self.cancel_after.map(|n| (n, cancelled.clone())),
                }),
                Box::new(StubClassifier {
                    scores: self.age_scores,
                    calls: calls.clone(),
                }),
                Box::new(StubClassifier {
                    scores: self.gender_scores,
                    calls: calls.clone(),
                }),
                Box::new(StubLog {
                    records: records.clone(),
                    fail: self.fail_log,
                }),
                Box::new(StubWriter {
                    log: writer_log.clone(),
                    fail_write: self.fail_write,
                }),
                Box::new(clock),
                match self.logger_events {
                    Some(events) => Box::new(StubLogger { events }) as Box<dyn PipelineLogger>,
                    None => Box::new(NullPipelineLogger),
                },
            )
            .with_config(self.config)
            .with_cancellation(cancelled);

            if self.live_view {
                use_case = use_case.with_live_view(Box::new(StubLiveView {
                    shown: shown.clone(),
                }));
            }

            let result = use_case.execute(Path::new("session.mp4"));
            let records = records.lock().unwrap().clone();
            let source_closed = *closed.lock().unwrap();
            let classifier_calls = *calls.lock().unwrap();
            let shown = *shown.lock().unwrap();
            Outcome {
                result,
                records,
                writer: writer_log,
                source_closed,
                classifier_calls,
                shown,
            }
        }
    }

    fn green_at(frame: &Frame, x: u32, y: u32) -> bool {
        let i = ((y * frame.width() + x) * 3) as usize;
        frame.data()[i..i + 3] == [0, 255, 0]
    }

    // --- Tests ---

    #[test]
    fn test_no_faces_writes_no_records() {
        let out = Harness::frames_at(&[0.0, 1.0, 2.0, 3.0, 4.0]).run();

        let report = out.result.unwrap();
        assert_eq!(report.frames, 5);
        assert_eq!(report.commits, 0);
        assert!(out.records.is_empty());
        assert_eq!(out.writer.lock().unwrap().frames.len(), 5);
        assert_eq!(out.classifier_calls, 0);
    }

    #[test]
    fn test_records_only_after_three_seconds() {
        let out = Harness::frames_at(&[0.0, 1.0, 2.0, 4.0])
            .faces_on(0..4, vec![face()])
            .run();

        let report = out.result.unwrap();
        assert_eq!(report.commits, 1);
        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.timestamp, t(4.0));
        assert_eq!(record.age, AgeBucket::From26To35);
        assert_eq!(record.gender, Gender::Woman);
    }

    #[test]
    fn test_face_leaving_before_threshold_logs_nothing() {
        let out = Harness::frames_at(&[0.0, 1.0, 2.0, 3.0, 4.0])
            .faces_on([0, 1, 3, 4], vec![face()])
            .run();

        assert_eq!(out.result.unwrap().commits, 0);
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_every_frame_past_threshold_logs_every_face() {
        let second = Region::new(34, 34, 20, 20, 0.8);
        let out = Harness::frames_at(&[0.0, 3.0, 3.05])
            .faces_on(0..3, vec![face(), second])
            .run();

        let report = out.result.unwrap();
        assert_eq!(report.commits, 2);
        assert_eq!(report.records_written, 4);
        assert_eq!(out.records.len(), 4);
        // Faces of one frame share the frame's timestamp
        assert_eq!(out.records[0].timestamp, out.records[1].timestamp);
    }

    #[test]
    fn test_logger_sees_faces_stage_timings_and_final_report() {
        let events = Arc::new(Mutex::new(LoggerEvents::default()));
        let mut harness = Harness::frames_at(&[0.0, 1.0, 4.5])
            .faces_on(1..3, vec![face(), Region::new(34, 34, 20, 20, 0.8)]);
        harness.logger_events = Some(events.clone());
        harness.detections.insert(0, None);

        let report = harness.run().result.unwrap();

        assert_eq!(report.commits, 1);
        let events = events.lock().unwrap();
        assert_eq!(events.faces_per_frame, vec![0, 2, 2]);
        let classify_runs = events.timed.iter().filter(|s| **s == Stage::Classify).count();
        let detect_runs = events.timed.iter().filter(|s| **s == Stage::Detect).count();
        assert_eq!(detect_runs, 3);
        assert_eq!(classify_runs, report.commits);
        assert_eq!(events.finished.as_ref(), Some(&report));
    }

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let out = Harness::frames_at(&[0.0, 4.7])
            .faces_on(0..2, vec![face()])
            .run();
        assert_eq!(out.records[0].timestamp, t(4.0));
    }

    #[test]
    fn test_tiny_crop_is_skipped_without_classifying() {
        let tiny = Region::new(50, 50, 5, 30, 0.9);
        let out = Harness::frames_at(&[0.0, 3.0])
            .faces_on(0..2, vec![tiny, face()])
            .run();

        let report = out.result.unwrap();
        assert_eq!(report.faces_skipped, 1);
        assert_eq!(report.records_written, 1);
        // One age and one gender call for the remaining face
        assert_eq!(out.classifier_calls, 2);
    }

    #[test]
    fn test_classifier_failure_skips_face_and_continues() {
        let mut harness = Harness::frames_at(&[0.0, 3.0, 4.0, 5.0]).faces_on(0..4, vec![face()]);
        harness.gender_scores = None;
        let out = harness.run();

        let report = out.result.unwrap();
        assert_eq!(report.classification_failures, 3);
        assert!(out.records.is_empty());
        assert_eq!(out.writer.lock().unwrap().frames.len(), 4);
    }

    #[test]
    fn test_malformed_scores_count_as_classification_failure() {
        let mut harness = Harness::frames_at(&[0.0, 3.0]).faces_on(0..2, vec![face()]);
        harness.age_scores = Some([f32::NAN; 8]);
        let out = harness.run();

        assert_eq!(out.result.unwrap().classification_failures, 1);
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_log_failure_drops_record_and_continues() {
        let mut harness = Harness::frames_at(&[0.0, 3.0, 4.0]).faces_on(0..3, vec![face()]);
        harness.fail_log = true;
        let out = harness.run();

        let report = out.result.unwrap();
        assert_eq!(report.log_failures, 2);
        assert_eq!(report.records_written, 0);
        assert_eq!(out.writer.lock().unwrap().frames.len(), 3);
    }

    #[test]
    fn test_detector_failure_keeps_tracking_state() {
        let mut harness = Harness::frames_at(&[0.0, 1.0, 4.5]);
        harness.detections.insert(0, Some(vec![face()]));
        harness.detections.insert(1, None);
        harness.detections.insert(2, Some(vec![face()]));
        let out = harness.run();

        assert_eq!(out.result.unwrap().commits, 1);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn test_committed_frames_are_annotated() {
        let out = Harness::frames_at(&[0.0, 3.0])
            .faces_on(0..2, vec![face()])
            .run();

        let writer = out.writer.lock().unwrap();
        assert!(!green_at(&writer.frames[0], 10, 10));
        assert!(green_at(&writer.frames[1], 10, 10));
    }

    #[test]
    fn test_transient_read_errors_are_retried() {
        let mut harness = Harness::new(vec![
            Step::Fail,
            Step::Frame(0.0),
            Step::Fail,
            Step::Fail,
            Step::Frame(1.0),
        ]);
        harness.config.max_read_retries = 2;
        let out = harness.run();

        assert_eq!(out.result.unwrap().frames, 2);
    }

    #[test]
    fn test_persistent_read_errors_are_fatal_and_release_resources() {
        let mut harness = Harness::new(vec![Step::Frame(0.0), Step::Fail, Step::Fail]);
        harness.config.max_read_retries = 1;
        let out = harness.run();

        assert!(matches!(
            out.result,
            Err(CaptureError::Read { attempts: 2, .. })
        ));
        assert_eq!(out.source_closed, 1);
        assert_eq!(out.writer.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_cancellation_stops_loop_cleanly() {
        let mut harness = Harness::frames_at(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        harness.cancel_after = Some(2);
        let out = harness.run();

        assert_eq!(out.result.unwrap().frames, 2);
        assert_eq!(out.source_closed, 1);
        assert_eq!(out.writer.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_open_failure_does_not_open_recording() {
        let mut harness = Harness::frames_at(&[0.0]);
        harness.fail_open = true;
        let out = harness.run();

        assert!(matches!(out.result, Err(CaptureError::Open(_))));
        assert!(!out.writer.lock().unwrap().opened);
        assert_eq!(out.source_closed, 1);
    }

    #[test]
    fn test_recording_failure_is_fatal() {
        let mut harness = Harness::frames_at(&[0.0, 1.0]);
        harness.fail_write = true;
        let out = harness.run();

        assert!(matches!(out.result, Err(CaptureError::Sink(_))));
        assert_eq!(out.source_closed, 1);
        assert_eq!(out.writer.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_live_view_failure_is_not_fatal() {
        let mut harness = Harness::frames_at(&[0.0, 1.0, 2.0]);
        harness.live_view = true;
        let out = harness.run();

        assert_eq!(out.result.unwrap().frames, 3);
        assert_eq!(out.shown, 3);
    }
}
