//! The command surface exposed to hosts (CLI, UI shells).
//!
//! [`App`] wires the engine to its collaborators and owns the
//! settings-and-vault bookkeeping around it. Every command maps onto one
//! engine transition or one collaborator call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{ConfigStore, TimerConfig};
use crate::device::device_hash;
use crate::display;
use crate::error::{CollaboratorError, ConfigError, Result};
use crate::events::Event;
use crate::stats::{local_today, StatsHandle, StatsRouter, StatsStore, TodayStats};
use crate::storage::{data_dir, AppConfig, ConfigView, Database, CONFIG_FILE, DB_FILE};
use crate::timer::{EngineState, RunLabels, TimerEngine, TimerStatus};
use crate::vault::{Project, Vault, VaultRecorder, VaultTask};

/// Key-value slot holding the persisted [`EngineState`].
pub const ENGINE_KEY: &str = "timer_engine";

pub struct App {
    engine: Arc<TimerEngine>,
    config: Arc<ConfigStore>,
    router: Arc<StatsRouter>,
    stats: StatsHandle,
    settings: RwLock<AppConfig>,
    settings_path: PathBuf,
    vault: RwLock<Option<Vault>>,
    device_hash: String,
}

impl App {
    /// Open the app in the default data directory.
    pub fn open_default(clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = data_dir().map_err(CollaboratorError::DataDir)?;
        Self::open(&dir, clock)
    }

    /// Open the app rooted at `data_dir`, restoring any persisted engine.
    ///
    /// A configured vault that has become invalid is dropped with a warning
    /// rather than failing startup.
    pub fn open(data_dir: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(CollaboratorError::DataDir)?;
        let settings_path = data_dir.join(CONFIG_FILE);
        let settings = AppConfig::load_from(&settings_path)?;
        let device_hash = device_hash(data_dir)?;

        let router = Arc::new(StatsRouter::new(Database::open_at(data_dir.join(DB_FILE))?));
        let vault = settings.vault_path.as_deref().and_then(|path| match Vault::open(path) {
            Ok(vault) => Some(vault),
            Err(e) => {
                warn!(path, error = %e, "configured vault is unusable");
                None
            }
        });
        if let Some(vault) = &vault {
            router.set_vault(Some(VaultRecorder::new(vault.clone(), device_hash.clone())));
        }

        let timer = match &settings.timer {
            Some(timer) => timer.clone(),
            None => vault_timer_config(vault.as_ref()),
        };
        let config = Arc::new(ConfigStore::new(timer)?);

        let store: Arc<dyn StatsStore> = router.clone();
        let stats = StatsHandle::spawn(store).map_err(CollaboratorError::StatsWorkerSpawn)?;

        let state = load_engine(router.database());
        let engine = TimerEngine::new(config.clone(), clock, Arc::new(stats.clone()));
        let engine = Arc::new(engine.with_state(state));

        Ok(Self {
            engine,
            config,
            router,
            stats,
            settings: RwLock::new(settings),
            settings_path,
            vault: RwLock::new(vault),
            device_hash,
        })
    }

    pub fn engine(&self) -> &Arc<TimerEngine> {
        &self.engine
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.engine.events().subscribe()
    }

    pub fn device_hash(&self) -> &str {
        &self.device_hash
    }

    /// Persist the engine so a later process can pick the run up.
    pub fn save_engine(&self) -> Result<()> {
        let json =
            serde_json::to_string(&self.engine.snapshot()).map_err(CollaboratorError::Snapshot)?;
        self.router
            .database()
            .kv_set(ENGINE_KEY, &json)
            .map_err(CollaboratorError::from)?;
        Ok(())
    }

    /// Wait for queued completions to be written.
    ///
    /// Blocks; must not be called from inside an async runtime.
    pub fn flush_stats(&self) -> Result<()> {
        self.stats.flush()?;
        Ok(())
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn get_timer_status(&self) -> TimerStatus {
        self.engine.status()
    }

    pub fn start_pomodoro(&self, labels: RunLabels) -> Result<TimerStatus> {
        self.engine.start_pomodoro(labels)
    }

    pub fn start_stopwatch(&self, labels: RunLabels) -> Result<TimerStatus> {
        self.engine.start_stopwatch(labels)
    }

    pub fn pause_timer(&self) -> Result<TimerStatus> {
        self.engine.pause()
    }

    pub fn resume_timer(&self) -> Result<TimerStatus> {
        self.engine.resume()
    }

    pub fn stop_timer(&self) -> Result<TimerStatus> {
        self.engine.stop()
    }

    pub fn complete_pomodoro(&self) -> Result<TimerStatus> {
        self.engine.complete_pomodoro()
    }

    pub fn skip_break(&self) -> Result<TimerStatus> {
        self.engine.skip_break()
    }

    pub fn complete_break(&self) -> Result<TimerStatus> {
        self.engine.complete_break()
    }

    pub fn get_tray_title(&self) -> String {
        display::tray_title(&self.engine.status())
    }

    /// Totals for the local calendar day. Completions still queued in the
    /// stats worker are not counted until [`App::flush_stats`] returns.
    pub fn get_today_stats(&self) -> Result<TodayStats> {
        Ok(self.router.today_stats(local_today())?)
    }

    // ── Config ───────────────────────────────────────────────────────

    pub fn get_config(&self) -> TimerConfig {
        self.config.get()
    }

    /// Validate, persist as the explicit override, then activate.
    ///
    /// The running segment keeps the duration it captured at its start.
    pub fn set_config(&self, config: TimerConfig) -> Result<TimerConfig> {
        config.validate()?;
        self.update_settings(|s| s.timer = Some(config.clone()))?;
        self.config.set(config.clone())?;
        Ok(config)
    }

    /// Drop the explicit override and fall back to the vault's (or the
    /// default) timer config.
    pub fn reset_config(&self) -> Result<TimerConfig> {
        let base = vault_timer_config(self.read_vault().as_ref());
        base.validate()?;
        self.update_settings(|s| s.timer = None)?;
        self.config.set(base.clone())?;
        Ok(base)
    }

    /// Point the app at a vault and adopt its plugin's timer config.
    pub fn set_vault_path(&self, path: &str) -> Result<TimerConfig> {
        let vault = Vault::open(path)?;
        let config = vault.read_plugin_config()?;
        config.validate()?;

        self.update_settings(|s| {
            s.vault_path = Some(path.to_string());
            s.timer = None;
        })?;
        self.config.set(config.clone())?;
        self.router.set_vault(Some(VaultRecorder::new(
            vault.clone(),
            self.device_hash.clone(),
        )));
        *self.vault.write().unwrap_or_else(PoisonError::into_inner) = Some(vault);
        info!(path, "vault configured");
        Ok(config)
    }

    /// Forget the vault. The active timer config is kept.
    pub fn clear_vault_path(&self) -> Result<()> {
        self.update_settings(|s| s.vault_path = None)?;
        self.router.set_vault(None);
        *self.vault.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("vault cleared");
        Ok(())
    }

    pub fn get_vault_path(&self) -> Option<String> {
        self.read_settings().vault_path
    }

    pub fn config_view(&self) -> ConfigView {
        ConfigView {
            vault_path: self.get_vault_path(),
            timer: self.config.get(),
        }
    }

    pub fn config_get(&self, key: &str) -> Result<String> {
        self.config_view()
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()).into())
    }

    /// Set one dot-path key.
    ///
    /// `vault_path` goes through [`App::set_vault_path`] (an empty value
    /// clears it); `timer.*` keys go through [`App::set_config`].
    pub fn config_set(&self, key: &str, value: &str) -> Result<ConfigView> {
        let current = self.config_view();
        let mut next = current.clone();
        next.set(key, value)?;

        if next.vault_path != current.vault_path {
            match next.vault_path.as_deref() {
                Some(path) if !path.is_empty() => {
                    self.set_vault_path(path)?;
                }
                _ => self.clear_vault_path()?,
            }
        }
        if next.timer != current.timer {
            self.set_config(next.timer)?;
        }
        Ok(self.config_view())
    }

    pub fn config_list(&self) -> Vec<(String, String)> {
        self.config_view().entries()
    }

    // ── Vault ────────────────────────────────────────────────────────

    pub fn scan_projects(&self) -> Result<Vec<Project>> {
        Ok(self.require_vault()?.scan_projects()?)
    }

    pub fn scan_tasks(&self) -> Result<Vec<VaultTask>> {
        Ok(self.require_vault()?.scan_tasks()?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn read_settings(&self) -> AppConfig {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_vault(&self) -> Option<Vault> {
        self.vault
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_vault(&self) -> Result<Vault, CollaboratorError> {
        self.read_vault().ok_or(CollaboratorError::VaultNotConfigured)
    }

    /// Apply `edit` to a copy of the settings, save it, then swap it in.
    fn update_settings<F>(&self, edit: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = settings.clone();
        edit(&mut next);
        next.save_to(&self.settings_path)?;
        *settings = next.clone();
        Ok(next)
    }
}

/// The vault plugin's timer config, or defaults when there is no usable one.
fn vault_timer_config(vault: Option<&Vault>) -> TimerConfig {
    let Some(vault) = vault else {
        return TimerConfig::default();
    };
    match vault.read_plugin_config() {
        Ok(config) if config.validate().is_ok() => config,
        Ok(_) => {
            warn!("vault plugin timer config is invalid, using defaults");
            TimerConfig::default()
        }
        Err(e) => {
            warn!(error = %e, "failed to read vault plugin config, using defaults");
            TimerConfig::default()
        }
    }
}

fn load_engine(db: &Database) -> EngineState {
    match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable engine snapshot");
            EngineState::default()
        }),
        Ok(None) => EngineState::default(),
        Err(e) => {
            warn!(error = %e, "failed to load engine snapshot");
            EngineState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::timer::TimerPhase;

    fn make_vault(root: &Path, data_json: Option<&str>) {
        let plugin = root.join(".obsidian/plugins/lifeos-pro");
        std::fs::create_dir_all(&plugin).unwrap();
        if let Some(json) = data_json {
            std::fs::write(plugin.join("data.json"), json).unwrap();
        }
    }

    fn open(dir: &Path, clock: &Arc<ManualClock>) -> App {
        App::open(dir, clock.clone()).unwrap()
    }

    #[test]
    fn engine_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());

        let app = open(dir.path(), &clock);
        app.start_pomodoro(RunLabels {
            task: Some("write".into()),
            ..RunLabels::default()
        })
        .unwrap();
        clock.advance_secs(600);
        app.save_engine().unwrap();
        drop(app);

        clock.advance_secs(300);
        let app = open(dir.path(), &clock);
        let status = app.get_timer_status();
        assert_eq!(status.phase, TimerPhase::Running);
        assert_eq!(status.elapsed_secs, 900);
        assert_eq!(status.remaining_secs, Some(600));
        assert_eq!(status.current_task.as_deref(), Some("write"));
    }

    #[test]
    fn completion_reaches_today_stats() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        app.start_pomodoro(RunLabels::default()).unwrap();
        clock.advance_secs(1500);
        let status = app.complete_pomodoro().unwrap();
        assert_eq!(status.phase, TimerPhase::ShortBreak);
        app.flush_stats().unwrap();

        let stats = app.get_today_stats().unwrap();
        assert_eq!(stats.pomodoro_count, 1);
        assert_eq!(stats.total_minutes, 25);
    }

    #[test]
    fn set_config_persists_override() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        let next = TimerConfig {
            pomodoro_duration: 50,
            ..TimerConfig::default()
        };
        app.set_config(next.clone()).unwrap();
        assert_eq!(app.get_config(), next);
        drop(app);

        let app = open(dir.path(), &clock);
        assert_eq!(app.get_config(), next);
    }

    #[test]
    fn invalid_config_is_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        let err = app
            .set_config(TimerConfig {
                short_break_duration: 0,
                ..TimerConfig::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
        assert_eq!(app.get_config(), TimerConfig::default());
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn vault_path_adopts_plugin_config() {
        let dir = tempfile::tempdir().unwrap();
        let vault_dir = tempfile::tempdir().unwrap();
        make_vault(vault_dir.path(), Some(r#"{"pomodoroDuration": 40}"#));
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        app.set_config(TimerConfig {
            pomodoro_duration: 10,
            ..TimerConfig::default()
        })
        .unwrap();
        let path = vault_dir.path().to_string_lossy().into_owned();
        let cfg = app.set_vault_path(&path).unwrap();
        assert_eq!(cfg.pomodoro_duration, 40);
        assert_eq!(app.get_config().pomodoro_duration, 40);
        assert_eq!(app.get_vault_path(), Some(path));
        assert!(app.scan_projects().unwrap().is_empty());
    }

    #[test]
    fn vault_with_loosely_typed_plugin_config_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let vault_dir = tempfile::tempdir().unwrap();
        let data = r#"{"pomodoroDuration": 30, "shortBreakDuration": null,
                       "pomodoroSound": "yes"}"#;
        make_vault(vault_dir.path(), Some(data));
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        let cfg = app
            .set_vault_path(&vault_dir.path().to_string_lossy())
            .unwrap();
        assert_eq!(cfg.pomodoro_duration, 30);
        assert_eq!(cfg.short_break_duration, 5);
        assert!(cfg.pomodoro_sound);
    }

    #[test]
    fn invalid_vault_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_vault = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        let err = app
            .set_vault_path(&not_a_vault.path().to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, CoreError::CollaboratorUnavailable(_)));
        assert!(app.get_vault_path().is_none());
    }

    #[test]
    fn scans_need_a_vault() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);
        assert!(matches!(
            app.scan_tasks(),
            Err(CoreError::CollaboratorUnavailable(
                CollaboratorError::VaultNotConfigured
            ))
        ));
    }

    #[test]
    fn dot_path_config_commands() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);

        assert_eq!(app.config_get("timer.pomodoroDuration").unwrap(), "25");
        app.config_set("timer.pomodoroDuration", "30").unwrap();
        assert_eq!(app.get_config().pomodoro_duration, 30);
        assert!(app.config_set("timer.longBreakInterval", "0").is_err());
        assert_eq!(app.get_config().long_break_interval, 4);
        assert!(app.config_get("nope").is_err());
        assert_eq!(app.config_list().len(), 7);

        let reset = app.reset_config().unwrap();
        assert_eq!(reset, TimerConfig::default());
        assert_eq!(app.get_config(), TimerConfig::default());
    }

    #[test]
    fn tray_title_follows_engine() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let app = open(dir.path(), &clock);
        assert_eq!(app.get_tray_title(), "");
        app.start_pomodoro(RunLabels::default()).unwrap();
        clock.advance_secs(1);
        assert_eq!(app.get_tray_title(), " 24:59");
    }
}
