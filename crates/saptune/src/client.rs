//! saptune client capability and its CLI implementation.

use crate::error::{Error, Result};
use async_trait::async_trait;
use hostexec::{CommandExecutor, Context};
use semver::Version;
use serde::Deserialize;
use std::sync::Arc;

/// Oldest saptune release whose JSON output and `solution change` we rely on.
pub const MIN_SUPPORTED_VERSION: Version = Version::new(3, 1, 0);

/// saptune capability consumed by the solution operators.
#[async_trait]
pub trait SaptuneClient: Send + Sync {
    /// Fail unless saptune is installed in a supported version.
    async fn check_version_support(&self, ctx: &Context) -> Result<()>;

    /// The applied solution id, or `""` when none is applied.
    async fn get_applied_solution(&self, ctx: &Context) -> Result<String>;

    async fn apply_solution(&self, ctx: &Context, solution: &str) -> Result<()>;

    async fn revert_solution(&self, ctx: &Context, solution: &str) -> Result<()>;

    async fn change_solution(&self, ctx: &Context, solution: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct AppliedOutput {
    result: AppliedResult,
}

#[derive(Debug, Deserialize)]
struct AppliedResult {
    #[serde(rename = "Solution applied", default)]
    solution_applied: Vec<AppliedSolution>,
}

#[derive(Debug, Deserialize)]
struct AppliedSolution {
    #[serde(rename = "Solution ID")]
    solution_id: String,
}

/// [`SaptuneClient`] shelling out to `saptune` and `rpm`.
pub struct SaptuneCli {
    executor: Arc<dyn CommandExecutor>,
}

impl SaptuneCli {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn run(&self, ctx: &Context, context: &str, args: &[&str]) -> Result<Vec<u8>> {
        self.executor
            .exec_ctx(ctx, "saptune", args)
            .await
            .map_err(|source| Error::Command {
                context: context.to_string(),
                source,
            })
    }
}

/// `rpm` may report versions like `3.1.2` or `3.1`; pad to full semver.
fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let padded = match trimmed.matches('.').count() {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|source| Error::InvalidVersion {
        version: trimmed.to_string(),
        source,
    })
}

/// Extract the applied solution id from `saptune --format json solution applied`.
fn parse_applied_solution(output: &[u8]) -> Result<String> {
    let parsed: AppliedOutput = serde_json::from_slice(output)?;
    Ok(parsed
        .result
        .solution_applied
        .into_iter()
        .next()
        .map(|s| s.solution_id)
        .unwrap_or_default())
}

#[async_trait]
impl SaptuneClient for SaptuneCli {
    async fn check_version_support(&self, ctx: &Context) -> Result<()> {
        let output = self
            .executor
            .exec_ctx(ctx, "rpm", &["-q", "--qf", "%{VERSION}", "saptune"])
            .await
            .map_err(Error::NotInstalled)?;
        let raw = String::from_utf8_lossy(&output);
        let installed = parse_version(&raw)?;
        log::debug!("Installed saptune version: {installed}");

        if installed < MIN_SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion {
                installed: installed.to_string(),
                required: MIN_SUPPORTED_VERSION.to_string(),
            });
        }
        Ok(())
    }

    async fn get_applied_solution(&self, ctx: &Context) -> Result<String> {
        let output = self
            .run(
                ctx,
                "could not get applied solution",
                &["--format", "json", "solution", "applied"],
            )
            .await?;
        parse_applied_solution(&output)
    }

    async fn apply_solution(&self, ctx: &Context, solution: &str) -> Result<()> {
        self.run(
            ctx,
            &format!("could not apply solution {solution}"),
            &["solution", "apply", solution],
        )
        .await?;
        Ok(())
    }

    async fn revert_solution(&self, ctx: &Context, solution: &str) -> Result<()> {
        self.run(
            ctx,
            &format!("could not revert solution {solution}"),
            &["solution", "revert", solution],
        )
        .await?;
        Ok(())
    }

    async fn change_solution(&self, ctx: &Context, solution: &str) -> Result<()> {
        self.run(
            ctx,
            &format!("could not change solution to {solution}"),
            &["solution", "change", solution],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostexec::fake::{Response, ScriptedExecutor};

    const RPM: &str = "rpm -q --qf %{VERSION} saptune";
    const APPLIED: &str = "saptune --format json solution applied";

    fn cli(exec: &Arc<ScriptedExecutor>) -> SaptuneCli {
        SaptuneCli::new(exec.clone())
    }

    #[test]
    fn test_parse_version_pads_short_versions() {
        assert_eq!(parse_version("3.1").unwrap(), Version::new(3, 1, 0));
        assert_eq!(parse_version("3\n").unwrap(), Version::new(3, 0, 0));
        assert_eq!(parse_version("3.1.2").unwrap(), Version::new(3, 1, 2));
        assert!(parse_version("not-a-version").is_err());
    }

    #[tokio::test]
    async fn test_version_support() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(RPM, Response::ok("3.1.2"));
        cli(&exec)
            .check_version_support(&Context::new())
            .await
            .unwrap();

        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(RPM, Response::ok("3.0.2"));
        let err = cli(&exec)
            .check_version_support(&Context::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "saptune version 3.0.2 is not supported, version 3.1.0 or later is required"
        );

        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(RPM, Response::fail(1, "package saptune is not installed"));
        let err = cli(&exec)
            .check_version_support(&Context::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotInstalled(_)));
    }

    #[tokio::test]
    async fn test_get_applied_solution() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(
            APPLIED,
            Response::ok(
                r#"{"$schema":"file:///usr/share/saptune/schemas/1.0/saptune_solution_applied.schema.json",
                "publish time":"2023-09-15 15:15:14.599","argv":"saptune --format json solution applied",
                "pid":1,"command":"solution applied","exit code":0,
                "result":{"Solution applied":[{"Solution ID":"HANA","applied partially":false}]},
                "messages":[]}"#,
            ),
        );
        assert_eq!(
            cli(&exec)
                .get_applied_solution(&Context::new())
                .await
                .unwrap(),
            "HANA"
        );
    }

    #[tokio::test]
    async fn test_no_applied_solution_is_empty() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(
            APPLIED,
            Response::ok(r#"{"result":{"Solution applied":[]},"messages":[]}"#),
        );
        assert_eq!(
            cli(&exec)
                .get_applied_solution(&Context::new())
                .await
                .unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_change_solution_error_context() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("saptune solution change S4HANA-APPSERVER", Response::fail(1, "ERROR"));
        let err = cli(&exec)
            .change_solution(&Context::new(), "S4HANA-APPSERVER")
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("could not change solution to S4HANA-APPSERVER:")
        );
    }
}
