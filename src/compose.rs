use docker_compose_types::{Compose, MapOrEmpty, Service, Volumes};

use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::stack::Stack;

/// Where the official Postgres image keeps its cluster.
pub const POSTGRES_DATA_DIR: &str = "/var/lib/postgresql/data";

/// What the deployment needs to know about the application's
/// `docker-compose.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeLayout {
    pub services: Vec<String>,
    /// Docker name of the named volume holding the database
    /// cluster, if the database service persists to one.
    pub db_volume: Option<String>,
}

/// Read and inspect the compose file on `host`.
pub fn load(host: &dyn Host, stack: &Stack) -> DeployResult<ComposeLayout> {
    let path = stack.compose_path();
    let content = host
        .read_file(&path)?
        .ok_or(DeployError::ComposeFileMissing(path))?;
    inspect(&content, stack)
}

/// Parse compose file content and check it declares the services
/// the stack relies on.
pub fn inspect(content: &str, stack: &Stack) -> DeployResult<ComposeLayout> {
    let compose: Compose =
        serde_yaml::from_str(content).map_err(|e| DeployError::ComposeInvalid(e.to_string()))?;

    let services: Vec<String> = compose.services.0.keys().cloned().collect();
    for required in [&stack.db_service, &stack.backend_service] {
        if !services.contains(required) {
            return Err(DeployError::ComposeInvalid(format!(
                "no '{required}' service defined"
            )));
        }
    }

    let db_volume = compose
        .services
        .0
        .get(&stack.db_service)
        .and_then(Option::as_ref)
        .and_then(data_volume_key)
        .and_then(|key| volume_name(&compose, &key, &stack.name));

    Ok(ComposeLayout {
        services,
        db_volume,
    })
}

/// The volume source mounted at the Postgres data directory.
fn data_volume_key(service: &Service) -> Option<String> {
    service.volumes.iter().find_map(|v| match v {
        Volumes::Simple(mount) => {
            let mut parts = mount.split(':');
            let source = parts.next()?;
            let target = parts.next()?;
            (target.trim_end_matches('/') == POSTGRES_DATA_DIR).then(|| source.to_string())
        }
        _ => None,
    })
}

/// Resolve a top-level volume key to the name Docker knows it by.
/// Bind mounts (not declared at top level) yield `None`.
fn volume_name(compose: &Compose, key: &str, project: &str) -> Option<String> {
    let declared = compose.volumes.0.get(key)?;
    let name = match declared {
        MapOrEmpty::Map(volume) => match (&volume.name, volume.external.is_some()) {
            (Some(name), _) => name.clone(),
            (None, true) => key.to_string(),
            (None, false) => format!("{project}_{key}"),
        },
        MapOrEmpty::Empty => format!("{project}_{key}"),
    };
    Some(name)
}
