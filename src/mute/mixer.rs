//! Channel level muting through `amixer`.

use super::types::{Channel, MuteBackendKind};
use crate::error::Result;
use crate::runner::CommandRunner;
use tracing::warn;

const AMIXER: &str = "amixer";
const MUTED_MARKER: &str = "[off]";
const SECONDARY_MARKER: &str = "'Speaker',0";

fn device_args(kind: MuteBackendKind) -> &'static [&'static str] {
    match kind {
        MuteBackendKind::MixerPulse => &["-D", "pulse"],
        _ => &[],
    }
}

/// The primary channel is always present; the secondary one only if the
/// mixer lists it.
pub async fn discover_channels(runner: &dyn CommandRunner) -> Vec<Channel> {
    let mut channels = vec![Channel::primary()];
    match runner.output(AMIXER, &[]).await {
        Ok(out) if out.contains(SECONDARY_MARKER) => {
            channels.push(Channel::new(Channel::SECONDARY));
        }
        Ok(_) => {}
        Err(e) => warn!("Could not enumerate mixer channels: {}", e),
    }
    channels
}

pub async fn is_muted(
    runner: &dyn CommandRunner,
    kind: MuteBackendKind,
    channel: &Channel,
) -> Result<bool> {
    let mut args: Vec<&str> = device_args(kind).to_vec();
    args.extend(["get", channel.name()]);
    let out = runner.output(AMIXER, &args).await?;
    Ok(out.contains(MUTED_MARKER))
}

/// Fires off a mute or unmute for one channel without waiting for it.
pub fn set(
    runner: &dyn CommandRunner,
    kind: MuteBackendKind,
    channel: &Channel,
    mute: bool,
) -> Result<()> {
    let mut args = vec!["-q"];
    args.extend(device_args(kind));
    args.extend(["set", channel.name(), if mute { "mute" } else { "unmute" }]);
    runner.spawn(AMIXER, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::ScriptedRunner;

    #[tokio::test]
    async fn test_secondary_channel_only_when_reported() {
        let runner = ScriptedRunner::new();
        runner.respond("amixer", "Simple mixer control 'Master',0\n");
        assert_eq!(discover_channels(&runner).await, vec![Channel::primary()]);

        runner.respond(
            "amixer",
            "Simple mixer control 'Master',0\nSimple mixer control 'Speaker',0\n",
        );
        assert_eq!(
            discover_channels(&runner).await,
            vec![Channel::primary(), Channel::new("Speaker")]
        );
    }

    #[tokio::test]
    async fn test_enumeration_failure_keeps_primary() {
        let runner = ScriptedRunner::new();
        assert_eq!(discover_channels(&runner).await, vec![Channel::primary()]);
    }

    #[tokio::test]
    async fn test_is_muted_uses_device() {
        let runner = ScriptedRunner::new();
        runner.respond(
            "amixer -D pulse get Master",
            "  Front Left: Playback 65536 [100%] [off]\n",
        );
        runner.respond("amixer get Master", "  Mono: Playback 31 [100%] [on]\n");

        let master = Channel::primary();
        assert!(is_muted(&runner, MuteBackendKind::MixerPulse, &master)
            .await
            .unwrap());
        assert!(!is_muted(&runner, MuteBackendKind::MixerAlsa, &master)
            .await
            .unwrap());
    }

    #[test]
    fn test_set_is_spawned() {
        let runner = ScriptedRunner::new();
        set(&runner, MuteBackendKind::MixerPulse, &Channel::primary(), true).unwrap();
        set(&runner, MuteBackendKind::MixerAlsa, &Channel::new("Speaker"), false).unwrap();
        assert_eq!(
            runner.spawned(),
            vec![
                "amixer -q -D pulse set Master mute".to_string(),
                "amixer -q set Speaker unmute".to_string()
            ]
        );
        assert!(runner.calls().is_empty());
    }
}
