use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::device::DeviceName;
use super::models::{DiscIdentity, Track};
use super::process::{Invocation, ToolError, ToolRunner};

pub const LOOKUP_BASE_URL: &str = "https://musicbrainz.org/cdtoc/";

#[derive(Debug, Error)]
pub enum DiscIdError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("no disc found")]
    NoDisc,

    #[error("unreadable identification output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Payload printed by the identification tool.
#[derive(Deserialize)]
struct ToolDisc {
    #[serde(alias = "firstTrack")]
    first_track: u32,
    #[serde(alias = "lastTrack")]
    last_track: u32,
    #[serde(default)]
    sectors: u64,
    #[serde(default, alias = "freedbId")]
    freedb_id: String,
    #[serde(default, alias = "musicbrainzId")]
    musicbrainz_id: Option<String>,
    #[serde(default)]
    tracks: Vec<Track>,
}

pub struct DiscIdentifier {
    runner: Arc<dyn ToolRunner>,
    program: String,
}

impl DiscIdentifier {
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Identify the disc in `device`. Anything the tool writes to stderr is
    /// a failure, even when stdout would parse.
    pub async fn identify(&self, device: &DeviceName) -> Result<DiscIdentity, DiscIdError> {
        let invocation = Invocation::new(&self.program)
            .arg("--json")
            .arg(device.dev_path().to_string_lossy());

        let output = self
            .runner
            .run(&invocation)
            .await?
            .require_clean(&self.program)?;

        let identity = parse_disc_identity(&output.stdout)?;
        info!(
            device = %device,
            last_track = identity.last_track,
            freedb_id = %identity.freedb_id,
            "Disc identified"
        );
        Ok(identity)
    }
}

pub fn parse_disc_identity(stdout: &str) -> Result<DiscIdentity, DiscIdError> {
    if stdout.trim().is_empty() {
        return Err(DiscIdError::NoDisc);
    }

    let disc: ToolDisc = serde_json::from_str(stdout)?;
    if disc.last_track == 0 {
        debug!("Identification reported zero tracks");
        return Err(DiscIdError::NoDisc);
    }

    let musicbrainz_id = disc.musicbrainz_id.filter(|id| !id.trim().is_empty());
    let musicbrainz_url = musicbrainz_id
        .as_ref()
        .map(|id| format!("{LOOKUP_BASE_URL}{id}"));

    Ok(DiscIdentity {
        first_track: disc.first_track,
        last_track: disc.last_track,
        sectors: disc.sectors,
        freedb_id: disc.freedb_id,
        musicbrainz_id,
        musicbrainz_url,
        tracks: disc.tracks,
    })
}

impl DiscIdentity {
    /// JSON form with every object's keys in sorted order, so repeated
    /// identifications of one disc serialize byte-for-byte the same.
    pub fn to_sorted_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self).map(sort_keys)
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SIMULATED_DISC_JSON, SimulatedRunner};
    use crate::core::process::ToolOutput;

    fn identifier(runner: &Arc<SimulatedRunner>) -> DiscIdentifier {
        DiscIdentifier::new(runner.clone(), "discid")
    }

    #[tokio::test]
    async fn parses_tool_output_and_derives_lookup_url() {
        let runner = Arc::new(SimulatedRunner::new());
        runner.push_response("discid", ToolOutput::success(SIMULATED_DISC_JSON));

        let sr0 = DeviceName::parse("sr0").unwrap();
        let disc = identifier(&runner).identify(&sr0).await.unwrap();

        assert_eq!(disc.first_track, 1);
        assert_eq!(disc.last_track, 3);
        assert_eq!(disc.sectors, 40000);
        assert_eq!(disc.freedb_id, "1e02bc03");
        assert_eq!(
            disc.musicbrainz_url.as_deref(),
            Some("https://musicbrainz.org/cdtoc/sim.disc.id.NdKZ4-")
        );
        assert_eq!(
            disc.tracks[1],
            Track {
                number: 2,
                offset: 13150,
                length: 14000
            }
        );

        let calls = runner.invocations_of("discid");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, ["--json", "/dev/sr0"]);
    }

    #[tokio::test]
    async fn stderr_wins_over_parseable_stdout() {
        let runner = Arc::new(SimulatedRunner::new());
        runner.push_response(
            "discid",
            ToolOutput {
                stderr: "cannot read TOC\n".to_string(),
                ..ToolOutput::success(SIMULATED_DISC_JSON)
            },
        );

        let sr0 = DeviceName::parse("sr0").unwrap();
        let err = identifier(&runner).identify(&sr0).await.unwrap_err();
        match err {
            DiscIdError::Tool(tool) => assert_eq!(tool.diagnostic(), Some("cannot read TOC")),
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_value() {
        let runner = Arc::new(SimulatedRunner::new());
        runner.push_response("discid", ToolOutput::failure(1, ""));

        let sr0 = DeviceName::parse("sr0").unwrap();
        let err = identifier(&runner).identify(&sr0).await.unwrap_err();
        assert!(matches!(err, DiscIdError::Tool(ToolError::ExitStatus { .. })));
    }

    #[test]
    fn empty_output_means_no_disc() {
        assert!(matches!(parse_disc_identity("  \n"), Err(DiscIdError::NoDisc)));
        assert!(matches!(
            parse_disc_identity(r#"{"first_track":0,"last_track":0}"#),
            Err(DiscIdError::NoDisc)
        ));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        assert!(matches!(
            parse_disc_identity("not json"),
            Err(DiscIdError::Parse(_))
        ));
    }

    #[test]
    fn no_long_identifier_means_no_url() {
        let disc = parse_disc_identity(
            r#"{"firstTrack":1,"lastTrack":2,"sectors":900,"freedbId":"0a00","musicbrainzId":""}"#,
        )
        .unwrap();
        assert_eq!(disc.musicbrainz_id, None);
        assert_eq!(disc.musicbrainz_url, None);
        assert!(disc.tracks.is_empty());
    }

    #[test]
    fn sorted_json_orders_keys() {
        let disc = parse_disc_identity(SIMULATED_DISC_JSON).unwrap();
        let text = serde_json::to_string(&disc.to_sorted_json().unwrap()).unwrap();

        let keys = [
            "\"firstTrack\"",
            "\"freedbId\"",
            "\"lastTrack\"",
            "\"musicbrainzId\"",
            "\"musicbrainzUrl\"",
            "\"sectors\"",
            "\"tracks\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
        assert!(text.contains(r#"{"length":13000,"number":1,"offset":150}"#));
    }
}
