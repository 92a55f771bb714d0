#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use teamdeck::board::BoardService;
use teamdeck::config::Config;
use teamdeck::delegation::TaskService;
use teamdeck::notify::{
    ConnectionDirectory, Notification, NotificationRelay, PushChannel,
};
use teamdeck::roadmap::RoadmapService;
use teamdeck::storage::Storage;
use tempfile::TempDir;

/// A temp data directory with storage initialized and default config.
pub struct TestEnv {
    dir: TempDir,
    pub storage: Storage,
    pub config: Config,
}

impl TestEnv {
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init_all().expect("failed to init storage");
        Self {
            dir,
            storage,
            config: Config::default(),
        }
    }

    /// Initialize with the given user ids registered
    pub fn with_users(users: &[&str]) -> Self {
        let env = Self::init();
        for user in users {
            env.storage.add_user(user, user).expect("failed to register user");
        }
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn boards(&self) -> BoardService {
        BoardService::new(self.storage.clone(), self.config.limits.clone())
    }

    pub fn roadmaps(&self) -> RoadmapService {
        RoadmapService::new(self.storage.clone(), self.config.limits.clone())
    }

    pub fn relay(&self) -> NotificationRelay {
        self.relay_with(
            Arc::new(ConnectionDirectory::new()),
            Arc::new(RecordingChannel::default()),
        )
    }

    pub fn relay_with(
        &self,
        directory: Arc<ConnectionDirectory>,
        channel: Arc<dyn PushChannel>,
    ) -> NotificationRelay {
        NotificationRelay::new(
            self.storage.clone(),
            directory,
            channel,
            self.config.notifications.clone(),
        )
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.storage.clone(), self.relay())
    }

    pub fn tasks_with(&self, relay: NotificationRelay) -> TaskService {
        TaskService::new(self.storage.clone(), relay)
    }
}

/// Push channel that records every delivered payload
#[derive(Default)]
pub struct RecordingChannel {
    pub pushes: Mutex<Vec<(String, String, Notification)>>,
}

impl PushChannel for RecordingChannel {
    fn push(&self, connection_id: &str, event: &str, payload: &Notification) -> bool {
        self.pushes.lock().unwrap().push((
            connection_id.to_string(),
            event.to_string(),
            payload.clone(),
        ));
        true
    }
}

pub fn teamdeck_cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("teamdeck").expect("teamdeck binary should build")
}
