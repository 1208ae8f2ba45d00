use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use super::PersistenceGateway;
use crate::{
    error::{GuideError, Result},
    types::{ids::ItineraryId, ids::OwnerId, itinerary::Itinerary},
};

const ITINERARY_DIR: &str = "itineraries";
const USER_DIR: &str = "users";

/// History document kept per user.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserHistory {
    dono: Option<OwnerId>,
    #[serde(default)]
    itinerarios: Vec<ItineraryId>,
}

/// Gateway backed by a directory of JSON documents.
///
/// ```text
/// <root>/itineraries/<id>.json   one itinerary, with its `_id`
/// <root>/users/<hex owner>.json  {"dono": ..., "itinerarios": [...]}
/// ```
///
/// Every file is written to a sibling temp file and renamed into place.
#[derive(Debug)]
pub struct JsonDirGateway {
    root: PathBuf,
    history_lock: Mutex<()>,
}

impl JsonDirGateway {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [ITINERARY_DIR, USER_DIR] {
            fs::create_dir_all(root.join(dir)).await.map_err(|err| {
                GuideError::Storage(format!("cannot create {}: {err}", root.join(dir).display()))
            })?;
        }
        Ok(Self {
            root,
            history_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn itinerary_path(&self, id: &ItineraryId) -> PathBuf {
        self.root.join(ITINERARY_DIR).join(format!("{id}.json"))
    }

    fn history_path(&self, owner: &OwnerId) -> PathBuf {
        self.root
            .join(USER_DIR)
            .join(format!("{}.json", hex_file_stem(owner.as_str())))
    }

    async fn read_history(&self, owner: &OwnerId) -> Result<UserHistory> {
        match read_json(&self.history_path(owner)).await? {
            Some(value) => serde_json::from_value(value).map_err(|err| {
                GuideError::Storage(format!("corrupt history for {owner}: {err}"))
            }),
            None => Ok(UserHistory::default()),
        }
    }
}

#[async_trait]
impl PersistenceGateway for JsonDirGateway {
    async fn insert(&self, itinerary: &Itinerary) -> Result<ItineraryId> {
        let id = ItineraryId::generate();
        let mut document = serde_json::to_value(itinerary)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("_id".to_string(), Value::String(id.to_string()));
        }

        let path = self.itinerary_path(&id);
        write_json(&path, &document).await?;
        debug!(target: "itinerary::storage", %id, path = %path.display(), "itinerary written");
        Ok(id)
    }

    async fn append_to_user_history(&self, owner: &OwnerId, id: &ItineraryId) -> Result<()> {
        let _guard = self.history_lock.lock().await;

        let mut history = self.read_history(owner).await?;
        history.dono = Some(owner.clone());
        history.itinerarios.push(*id);

        write_json(&self.history_path(owner), &serde_json::to_value(&history)?).await?;
        debug!(target: "itinerary::storage", %owner, %id, "history appended");
        Ok(())
    }

    async fn remove(&self, id: &ItineraryId) -> Result<()> {
        match fs::remove_file(self.itinerary_path(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(GuideError::Storage(format!("cannot remove itinerary {id}: {err}"))),
        }
    }

    async fn find(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        let Some(mut document) = read_json(&self.itinerary_path(id)).await? else {
            return Ok(None);
        };
        if let Value::Object(fields) = &mut document {
            fields.remove("_id");
        }
        serde_json::from_value(document)
            .map(Some)
            .map_err(|err| GuideError::Storage(format!("corrupt itinerary {id}: {err}")))
    }

    async fn history(&self, owner: &OwnerId) -> Result<Vec<ItineraryId>> {
        Ok(self.read_history(owner).await?.itinerarios)
    }
}

/// Filesystem-safe, collision-free file stem for an arbitrary owner id.
fn hex_file_stem(raw: &str) -> String {
    raw.bytes().map(|byte| format!("{byte:02x}")).collect()
}

async fn read_json(path: &Path) -> Result<Option<Value>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(GuideError::Storage(format!(
                "cannot read {}: {err}",
                path.display()
            )))
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| GuideError::Storage(format!("{} is not JSON: {err}", path.display())))
}

async fn write_json(path: &Path, value: &Value) -> Result<()> {
    let staging = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(value)?;

    let written = async {
        fs::write(&staging, &body).await?;
        fs::rename(&staging, path).await
    }
    .await;

    written.map_err(|err| {
        warn!(target: "itinerary::storage", path = %path.display(), error = %err, "write failed");
        GuideError::Storage(format!("cannot write {}: {err}", path.display()))
    })
}
