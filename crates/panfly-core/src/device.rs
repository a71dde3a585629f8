// ── Device facade ──
//
// The one entry point most callers need. A `Device` validates, resolves,
// encodes and sends in a single call, and drives commits to completion.
// It is cheap to clone and every clone shares one connection pool, so
// concurrent tasks can each hold a handle.

use std::future::Future;
use std::sync::Arc;

use panfly_api::XmlApiClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::{self, Codec};
use crate::commit::{CommitEngine, JobReport};
use crate::config::DeviceConfig;
use crate::context::DeviceContext;
use crate::error::CoreError;
use crate::model::{ConfigEntry, Fields, ObjectType, ValidationResult};
use crate::path::{LocationPath, PathResolver};
use crate::schema::SchemaRegistry;
use crate::validate::Validator;

#[derive(Debug, Clone, Copy)]
enum ConfigTree {
    Candidate,
    Running,
}

/// Handle to one firewall or Panorama.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    config: DeviceConfig,
    client: Arc<XmlApiClient>,
    validator: Validator,
    codec: Codec,
    resolver: PathResolver,
    commits: CommitEngine,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("url", &self.inner.config.url.as_str())
            .field("kind", &self.inner.config.kind)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Build a device handle with the built-in schemas. No request is made
    /// until the first operation.
    pub fn new(config: DeviceConfig) -> Result<Self, CoreError> {
        Self::with_registry(config, SchemaRegistry::builtin())
    }

    /// Build a device handle with a custom schema registry.
    pub fn with_registry(
        config: DeviceConfig,
        registry: Arc<SchemaRegistry>,
    ) -> Result<Self, CoreError> {
        let client = XmlApiClient::from_api_key(
            &config.url,
            &config.api_key,
            &config.transport(),
            config.retry.to_policy(),
        )?;
        Ok(Self::from_client(config, client, registry))
    }

    /// Wrap an already-built client.
    pub fn from_client(
        config: DeviceConfig,
        client: XmlApiClient,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        let client = Arc::new(client);
        Self {
            inner: Arc::new(DeviceInner {
                validator: Validator::new(Arc::clone(&registry)),
                codec: Codec::new(Arc::clone(&registry)),
                resolver: PathResolver::new(registry, config.default_vsys.clone()),
                commits: CommitEngine::new(Arc::clone(&client), config.poll),
                client,
                config,
            }),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.inner.validator.registry()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.inner.resolver
    }

    pub fn commits(&self) -> &CommitEngine {
        &self.inner.commits
    }

    /// Context built from loose selectors, checked against this device's
    /// kind.
    pub fn context(
        &self,
        vsys: Option<&str>,
        device_group: Option<&str>,
        template: Option<&str>,
    ) -> Result<DeviceContext, CoreError> {
        DeviceContext::from_selectors(self.inner.config.kind, vsys, device_group, template)
    }

    // ── Local checks ─────────────────────────────────────────────────

    /// Validate without sending anything.
    pub fn validate(&self, entry: &ConfigEntry) -> Result<ValidationResult, CoreError> {
        self.inner.validator.validate_entry(entry)
    }

    /// Location of one entry, without sending anything.
    pub fn locate(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<LocationPath, CoreError> {
        self.check_context(ctx)?;
        self.inner.resolver.resolve(object_type, entry_name, ctx)
    }

    // ── Candidate configuration ──────────────────────────────────────

    /// Create or merge an object into the candidate configuration.
    ///
    /// Validation runs first; an invalid entry fails with
    /// `CoreError::Validation` and nothing is sent. On success the returned
    /// result carries any warnings.
    pub async fn apply(
        &self,
        entry: &ConfigEntry,
        ctx: &DeviceContext,
    ) -> Result<ValidationResult, CoreError> {
        self.check_context(ctx)?;
        let (prepared, result) = self.inner.validator.prepare(entry)?;
        let xpath = self
            .inner
            .resolver
            .resolve_collection(prepared.object_type, ctx)?;
        let element = self.inner.codec.encode_entry(&prepared)?;

        debug!(object_type = %prepared.object_type, name = %prepared.name, %xpath, "set");
        self.inner
            .client
            .set_config(xpath.as_str(), element.as_str())
            .await
            .map_err(|e| CoreError::from_api(e, prepared.object_type, Some(&prepared.name)))?;

        info!(object_type = %prepared.object_type, name = %prepared.name, %ctx, "applied");
        Ok(result)
    }

    /// Replace an object wholesale. Fields absent from `entry` are removed
    /// from the device.
    pub async fn replace(
        &self,
        entry: &ConfigEntry,
        ctx: &DeviceContext,
    ) -> Result<ValidationResult, CoreError> {
        self.check_context(ctx)?;
        let (prepared, result) = self.inner.validator.prepare(entry)?;
        let xpath = self
            .inner
            .resolver
            .resolve(prepared.object_type, &prepared.name, ctx)?;
        let element = self.inner.codec.encode_entry(&prepared)?;

        debug!(object_type = %prepared.object_type, name = %prepared.name, %xpath, "edit");
        self.inner
            .client
            .edit_config(xpath.as_str(), element.as_str())
            .await
            .map_err(|e| CoreError::from_api(e, prepared.object_type, Some(&prepared.name)))?;

        info!(object_type = %prepared.object_type, name = %prepared.name, %ctx, "replaced");
        Ok(result)
    }

    pub async fn delete(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<(), CoreError> {
        let xpath = self.locate(object_type, entry_name, ctx)?;
        self.inner
            .client
            .delete_config(xpath.as_str())
            .await
            .map_err(|e| not_found_or(e, object_type, entry_name, &xpath))?;

        info!(%object_type, name = entry_name, %ctx, "deleted");
        Ok(())
    }

    /// Fetch one object's fields from the candidate configuration.
    pub async fn read(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<Fields, CoreError> {
        self.read_from(ConfigTree::Candidate, object_type, entry_name, ctx)
            .await
    }

    /// Fetch one object's fields from the running (committed)
    /// configuration.
    pub async fn read_running(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<Fields, CoreError> {
        self.read_from(ConfigTree::Running, object_type, entry_name, ctx)
            .await
    }

    async fn read_from(
        &self,
        tree: ConfigTree,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<Fields, CoreError> {
        let xpath = self.locate(object_type, entry_name, ctx)?;
        let client = &self.inner.client;
        let response = match tree {
            ConfigTree::Candidate => client.get_config(xpath.as_str()).await,
            ConfigTree::Running => client.show_config(xpath.as_str()).await,
        }
        .map_err(|e| not_found_or(e, object_type, entry_name, &xpath))?;

        let entry = response
            .result
            .as_ref()
            .and_then(|r| r.child("entry"))
            .ok_or_else(|| CoreError::NotFound {
                object_type,
                entry_name: entry_name.to_owned(),
                xpath: xpath.to_string(),
            })?;
        self.inner.codec.decode(object_type, entry)
    }

    /// Every object of a type in the given scope, in device order.
    pub async fn list(
        &self,
        object_type: ObjectType,
        ctx: &DeviceContext,
    ) -> Result<Vec<ConfigEntry>, CoreError> {
        self.check_context(ctx)?;
        let xpath = self.inner.resolver.resolve_collection(object_type, ctx)?;
        let response = match self.inner.client.get_config(xpath.as_str()).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::from_api(e, object_type, None)),
        };

        let Some(result) = response.result else {
            return Ok(Vec::new());
        };
        // `<result><address><entry/>...</address></result>`; some releases
        // omit the container element.
        let container = match result.children().first() {
            Some(first) if first.name() != "entry" => first,
            _ => &result,
        };
        self.inner.codec.decode_collection(object_type, container)
    }

    // ── Commit lifecycle ─────────────────────────────────────────────

    /// Commit the candidate configuration and wait for the job to finish.
    ///
    /// Device-group and template contexts commit only that scope.
    pub async fn commit_and_wait(
        &self,
        ctx: &DeviceContext,
        description: Option<&str>,
    ) -> Result<JobReport, CoreError> {
        self.check_context(ctx)?;
        self.inner
            .commits
            .commit_and_wait(ctx, description, None)
            .await
    }

    /// As [`commit_and_wait`](Self::commit_and_wait), abandoning the wait
    /// when `cancel` fires. The job itself keeps running on the device.
    pub async fn commit_and_wait_until_cancelled(
        &self,
        ctx: &DeviceContext,
        description: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, CoreError> {
        self.check_context(ctx)?;
        self.inner
            .commits
            .commit_and_wait(ctx, description, Some(cancel))
            .await
    }

    /// Discard uncommitted changes.
    pub async fn revert(&self) -> Result<(), CoreError> {
        self.inner.client.revert_config().await?;
        info!("candidate configuration reverted");
        Ok(())
    }

    /// `show system info`, decoded by shape.
    pub async fn system_info(&self) -> Result<Fields, CoreError> {
        let system = self.inner.client.system_info().await?;
        Ok(codec::decode_untyped(&system))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// One-shot: build a device, run the closure, shut down.
    pub async fn oneshot<F, Fut, T>(config: DeviceConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Device) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let device = Device::new(config)?;
        let result = f(device.clone()).await;
        device.shutdown();
        result
    }

    /// Release this handle. The connection pool closes once the last
    /// clone is shut down or dropped.
    pub fn shutdown(self) {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => {
                let DeviceInner {
                    client, commits, ..
                } = inner;
                drop(commits);
                match Arc::try_unwrap(client) {
                    Ok(client) => client.close(),
                    Err(_) => debug!("client still referenced; pool closes on last drop"),
                }
            }
            Err(_) => debug!("other device handles alive; pool stays open"),
        }
    }

    fn check_context(&self, ctx: &DeviceContext) -> Result<(), CoreError> {
        if ctx.kind() == self.inner.config.kind {
            Ok(())
        } else {
            Err(CoreError::InvalidContext {
                reason: format!(
                    "{ctx} cannot be used with a {} connection",
                    self.inner.config.kind
                ),
            })
        }
    }
}

fn not_found_or(
    err: panfly_api::Error,
    object_type: ObjectType,
    entry_name: &str,
    xpath: &LocationPath,
) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound {
            object_type,
            entry_name: entry_name.to_owned(),
            xpath: xpath.to_string(),
        }
    } else {
        CoreError::from_api(err, object_type, Some(entry_name))
    }
}
