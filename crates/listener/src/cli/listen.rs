//! `pushwire listen`: run one channel until Ctrl-C.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use pw_channel::{ChannelEvent, PushChannel, PushChannelBuilder};
use pw_domain::Config;
use tokio::time::Interval;

use super::credentials;

pub async fn run(config: &Config, status_interval: Option<u64>) -> anyhow::Result<()> {
    let provider = credentials::from_config(&config.auth)?;
    let channel = PushChannelBuilder::from_config(&config.channel)
        .credentials_arc(provider)
        .logger(|line| tracing::info!(target: "pushwire::channel", "{line}"))
        .build()
        .context("building channel")?;

    let mut events = channel.subscribe();
    channel.connect();
    tracing::info!("pushwire listening");

    let mut ticker = status_interval.map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("{}", event_line(&event, Utc::now())?);
                if let ChannelEvent::Disconnect { retryable: false, message } = event {
                    channel.disconnect();
                    anyhow::bail!("channel gave up: {message}");
                }
            }
            _ = tick(&mut ticker) => report_status(&channel).await,
            _ = &mut ctrl_c => {
                tracing::info!("interrupt received, disconnecting");
                channel.disconnect();
                return Ok(());
            }
        }
    }
}

/// One JSON line: the event's own fields plus an RFC 3339 `at`.
pub fn event_line(event: &ChannelEvent, at: DateTime<Utc>) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(event)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "at".into(),
            at.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
    }
    Ok(serde_json::to_string(&value)?)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn report_status(channel: &PushChannel) {
    let cached = channel.is_connected();
    let derived = channel.is_connected_v2().await;
    let probe = channel.ping().await;
    match probe {
        Ok(rtt) => tracing::info!(
            cached,
            derived,
            rtt_ms = rtt.as_millis() as u64,
            "channel status"
        ),
        Err(e) => tracing::info!(cached, derived, probe = %e, "channel status"),
    }
    if let Ok(status) = channel.status().await {
        tracing::debug!(
            state = ?status.state,
            attempt = status.attempt_count,
            retry_scheduled = status.retry_scheduled,
            "channel state"
        );
    }
}
