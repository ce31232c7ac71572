//! Container runtime used to run Airbyte destinations
//!
//! The connector only needs three things from a runtime: pull an image,
//! run a container with a payload on stdin, and run a container to
//! completion collecting stdout. [`DockerRuntime`] does this through the
//! Docker Engine API.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    LogsOptions, RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// A host path or named volume exposed inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: String,
    pub target: String,
}

impl MountSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Absolute sources are bind mounts, anything else names a volume
    pub fn is_bind(&self) -> bool {
        self.source.starts_with('/')
    }
}

/// Everything needed to create one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    pub mounts: Vec<MountSpec>,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Make sure `image` is available locally
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Run a container, feed `stdin` to it and return its output
    ///
    /// The container is removed (with its volumes) before returning.
    async fn run_with_stdin(&self, spec: &ContainerSpec, stdin: Vec<u8>) -> Result<String>;

    /// Run a container until it stops and return its stdout
    ///
    /// The container is removed (with its volumes) before returning.
    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String>;
}

/// [`ContainerRuntime`] backed by the local Docker daemon
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform default socket
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::container(format!("failed to connect to Docker: {e}")))?;
        Ok(Self { docker })
    }

    fn host_config(spec: &ContainerSpec) -> HostConfig {
        let mounts = spec
            .mounts
            .iter()
            .map(|m| Mount {
                typ: Some(if m.is_bind() {
                    MountTypeEnum::BIND
                } else {
                    MountTypeEnum::VOLUME
                }),
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                ..Default::default()
            })
            .collect();

        HostConfig {
            mounts: Some(mounts),
            ..Default::default()
        }
    }

    /// Create options for a run; only stdin-fed runs get a TTY
    pub(crate) fn container_config(spec: &ContainerSpec, interactive: bool) -> Config<String> {
        Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            tty: Some(interactive),
            attach_stdin: Some(interactive),
            attach_stdout: Some(true),
            open_stdin: Some(interactive),
            stdin_once: Some(interactive),
            host_config: Some(Self::host_config(spec)),
            ..Default::default()
        }
    }

    async fn create(&self, spec: &ContainerSpec, interactive: bool) -> Result<String> {
        let config = Self::container_config(spec, interactive);
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| Error::container(format!("failed to create container: {e}")))?;
        debug!(container = %spec.name, id = %response.id, "Created container");
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::container(format!("failed to start container: {e}")))
    }

    async fn wait(&self, id: &str) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(id, Some(options));
        match stream.next().await {
            Some(Ok(resp)) => Ok(resp.status_code),
            // A non-zero exit is reported as an error by the Engine API
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(Error::container(format!(
                "error waiting for container: {e}"
            ))),
            None => Ok(0),
        }
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| Error::container(format!("failed to remove container: {e}")))
    }

    async fn stdout(&self, id: &str) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            follow: false,
            ..Default::default()
        };
        let mut logs = self.docker.logs(id, Some(options));
        let mut output = String::new();
        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message } | LogOutput::Console { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => return Err(Error::container(format!("error reading logs: {e}"))),
            }
        }
        Ok(output)
    }

    async fn attach_and_run(&self, id: &str, stdin: Vec<u8>) -> Result<String> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            ..Default::default()
        };
        let AttachContainerResults {
            mut output,
            mut input,
        } = self
            .docker
            .attach_container(id, Some(options))
            .await
            .map_err(|e| Error::container(format!("failed to attach container: {e}")))?;

        input.write_all(&stdin).await?;
        input.flush().await?;

        self.start(id).await?;

        let mut collected = String::new();
        while let Some(chunk) = output.next().await {
            let chunk =
                chunk.map_err(|e| Error::container(format!("error reading output: {e}")))?;
            collected.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }

        let code = self.wait(id).await?;
        if code != 0 {
            return Err(Error::container(format!(
                "container exited with status {code}: {}",
                collected.trim()
            )));
        }
        Ok(collected)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| Error::container(format!("failed to pull {image}: {e}")))?;
        }
        info!(image, "Pulled image");
        Ok(())
    }

    async fn run_with_stdin(&self, spec: &ContainerSpec, stdin: Vec<u8>) -> Result<String> {
        let id = self.create(spec, true).await?;
        let result = self.attach_and_run(&id, stdin).await;
        if let Err(e) = self.remove(&id).await {
            warn!(container = %spec.name, error = %e, "Failed to remove container");
        }
        result
    }

    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self.create(spec, false).await?;
        let result = async {
            self.start(&id).await?;
            self.wait(&id).await?;
            self.stdout(&id).await
        }
        .await;
        if let Err(e) = self.remove(&id).await {
            warn!(container = %spec.name, error = %e, "Failed to remove container");
        }
        result
    }
}
