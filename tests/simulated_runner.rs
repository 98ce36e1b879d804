use std::sync::Arc;

use cdripd::adapters::{SimulatedRunner, get_runner};
use cdripd::core::{
    DRIVE_OK_LINE, DeviceName, DiscIdentifier, DriveAnalyzer, Invocation, RipOrchestrator,
    ToolOutput, ToolRunner, TrackRipRequest,
};
use tempfile::tempdir;

fn sr0() -> DeviceName {
    DeviceName::parse("sr0").unwrap()
}

#[tokio::test]
async fn test_scripted_responses_are_consumed_in_order() {
    let runner = SimulatedRunner::new();
    runner.push_response("eject", ToolOutput::failure(1, "first"));
    runner.push_response("eject", ToolOutput::failure(2, "second"));

    let inv = Invocation::new("eject").arg("sr0");
    assert_eq!(runner.run(&inv).await.unwrap().stderr, "first");
    assert_eq!(runner.run(&inv).await.unwrap().stderr, "second");
    assert!(runner.run(&inv).await.unwrap().exited_ok());

    assert_eq!(runner.invocations_of("eject").len(), 3);
    assert!(runner.invocations_of("discid").is_empty());
}

#[tokio::test]
async fn test_imitated_rip_writes_wav_and_log() {
    let dir = tempdir().unwrap();
    let runner = Arc::new(SimulatedRunner::new());
    let identifier = Arc::new(DiscIdentifier::new(runner.clone(), "discid"));
    let ripper = RipOrchestrator::new(runner.clone(), "cdparanoia", identifier);

    let rip = ripper
        .rip_track(&TrackRipRequest {
            device: sr0(),
            track: 2,
            speed: 4,
            output_dir: dir.path().join("rips"),
            filename: "two".to_string(),
        })
        .await
        .unwrap();

    let wav = std::fs::read(&rip.wav_file).unwrap();
    assert_eq!(wav.len(), 44);
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert!(rip.log_file.exists());
}

#[tokio::test]
async fn test_imitated_analysis_passes() {
    let dir = tempdir().unwrap();
    let runner: Arc<dyn ToolRunner> = get_runner(true, dir.path());
    let analyzer = DriveAnalyzer::new(runner, "cdparanoia", dir.path());

    let result = analyzer.analyze(&sr0(), Some(8)).await.unwrap();
    assert!(result.passed);
    assert_eq!(result.last_line, DRIVE_OK_LINE);
}

#[tokio::test]
async fn test_imitated_identification_reports_three_tracks() {
    let runner = Arc::new(SimulatedRunner::new());
    let identifier = DiscIdentifier::new(runner, "discid");

    let disc = identifier.identify(&sr0()).await.unwrap();
    assert_eq!(disc.first_track, 1);
    assert_eq!(disc.last_track, 3);
    assert_eq!(disc.tracks.len(), 3);
    assert_eq!(disc.freedb_id, "1e02bc03");
}
