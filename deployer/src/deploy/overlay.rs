//! Merges step overrides into a file descriptor

use marathon_api::{App, FetchUri};
use tracing::debug;

use crate::config::settings::StepConfig;
use crate::deploy::env::EnvContext;

/// Overlay the overrides of `config` on `app`.
///
/// App id and Docker image overrides replace the file values when they are
/// non-empty after substitution. URIs and labels from the configuration are
/// added after the file entries; a URI already present is not repeated and
/// an override label replaces a file label with the same key. Only override
/// strings are substituted, the file content is taken as is.
pub fn apply(mut app: App, config: &StepConfig, env: &EnvContext) -> App {
    if let Some(id) = expand_non_empty(config.app_id.as_deref(), env) {
        debug!("Overriding app id '{}' with '{}'", app.id, id);
        app.id = id;
    }

    if let Some(image) = expand_non_empty(config.docker.as_deref(), env) {
        debug!("Overriding docker image with '{}'", image);
        let docker = app.set_docker_image(image);
        if config.docker_force_pull {
            docker.force_pull_image = Some(true);
        }
    } else if config.docker_force_pull {
        if let Some(docker) = app.container.as_mut().and_then(|c| c.docker.as_mut()) {
            docker.force_pull_image = Some(true);
        }
    }

    for uri in &config.uris {
        let location = env.expand(uri.uri.trim());
        if location.is_empty() || app.fetch.iter().any(|f| f.uri == location) {
            continue;
        }
        app.fetch.push(FetchUri {
            uri: location,
            ..uri.clone()
        });
    }

    for label in &config.labels {
        let name = env.expand(label.name.trim());
        if name.is_empty() {
            continue;
        }
        app.labels.insert(name, env.expand(&label.value));
    }

    app
}

fn expand_non_empty(value: Option<&str>, env: &EnvContext) -> Option<String> {
    value
        .map(|v| env.expand(v.trim()))
        .filter(|v| !v.trim().is_empty())
}
