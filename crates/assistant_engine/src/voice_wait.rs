use std::sync::Arc;
use std::time::Duration;

use assistant_core::{select_voice, VoiceDescriptor, VoicePreferences};
use assistant_logging::{assistant_debug, assistant_info, assistant_warn};
use tokio::sync::Notify;

/// A host voice list that may still be populating when first read.
pub trait VoiceCatalog: Send + Sync {
    fn voices(&self) -> Vec<VoiceDescriptor>;

    /// Signalled (with `notify_one`) when the list changes, if the host can tell.
    fn change_notifier(&self) -> Option<Arc<Notify>> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct VoicePollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for VoicePollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_attempts: 20,
        }
    }
}

/// Waits for the catalog to populate, by polling and by change notification,
/// then picks a voice. `None` once the attempts are exhausted.
pub async fn resolve_voice(
    catalog: &dyn VoiceCatalog,
    preferences: &VoicePreferences,
    settings: &VoicePollSettings,
) -> Option<VoiceDescriptor> {
    let notifier = catalog.change_notifier();
    for attempt in 1..=settings.max_attempts {
        let voices = catalog.voices();
        if let Some(index) = select_voice(&voices, preferences) {
            let voice = voices.into_iter().nth(index)?;
            assistant_info!("voice '{}' selected after {} attempt(s)", voice.name, attempt);
            return Some(voice);
        }
        if attempt == settings.max_attempts {
            break;
        }
        match &notifier {
            Some(notify) => {
                tokio::select! {
                    _ = notify.notified() => assistant_debug!("voice catalog changed"),
                    _ = tokio::time::sleep(settings.interval) => {}
                }
            }
            None => tokio::time::sleep(settings.interval).await,
        }
    }
    assistant_warn!(
        "no voices available after {} attempts",
        settings.max_attempts
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct SlowCatalog {
        reads: AtomicU32,
        ready_after: u32,
        voices: Vec<VoiceDescriptor>,
        notify: Option<Arc<Notify>>,
        late: Mutex<Vec<VoiceDescriptor>>,
    }

    impl VoiceCatalog for SlowCatalog {
        fn voices(&self) -> Vec<VoiceDescriptor> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            let late = self.late.lock().unwrap();
            if !late.is_empty() {
                return late.clone();
            }
            if read > self.ready_after {
                self.voices.clone()
            } else {
                Vec::new()
            }
        }

        fn change_notifier(&self) -> Option<Arc<Notify>> {
            self.notify.clone()
        }
    }

    fn voices() -> Vec<VoiceDescriptor> {
        vec![
            VoiceDescriptor::new("Microsoft David", "en-US", true),
            VoiceDescriptor::new("Microsoft Zira", "en-US", false),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_catalog_populates() {
        let catalog = SlowCatalog {
            ready_after: 3,
            voices: voices(),
            ..SlowCatalog::default()
        };
        let started = Instant::now();

        let voice = resolve_voice(&catalog, &VoicePreferences::default(), &VoicePollSettings::default())
            .await
            .expect("voice");

        assert_eq!(voice.name, "Microsoft Zira");
        assert_eq!(catalog.reads.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let catalog = SlowCatalog {
            ready_after: u32::MAX,
            ..SlowCatalog::default()
        };
        let settings = VoicePollSettings::default();

        let voice = resolve_voice(&catalog, &VoicePreferences::default(), &settings).await;

        assert!(voice.is_none());
        assert_eq!(catalog.reads.load(Ordering::SeqCst), settings.max_attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn change_notification_cuts_the_wait_short() {
        let notify = Arc::new(Notify::new());
        let catalog = Arc::new(SlowCatalog {
            ready_after: u32::MAX,
            notify: Some(notify.clone()),
            ..SlowCatalog::default()
        });
        let settings = VoicePollSettings {
            interval: Duration::from_secs(60),
            max_attempts: 3,
        };

        let populate = {
            let catalog = catalog.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                *catalog.late.lock().unwrap() = voices();
                notify.notify_one();
            }
        };
        let preferences = VoicePreferences::default();
        let started = Instant::now();
        let (voice, ()) = tokio::join!(
            resolve_voice(catalog.as_ref(), &preferences, &settings),
            populate
        );

        assert_eq!(voice.map(|voice| voice.name).as_deref(), Some("Microsoft Zira"));
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
