use anyhow::{Context as _, Result, bail};
use operator::{Arguments, ExecutionReport, Registry};

use crate::Context;
use crate::cli::RunArgs;
use crate::operators::standard_registry;
use crate::ui;

pub fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let registry = standard_registry(&ctx.config);
    let operation_id = args
        .operation_id
        .clone()
        .unwrap_or_else(|| format!("local-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f")));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Could not start async runtime")?;
    let report = runtime.block_on(execute(&registry, &operation_id, args))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Could not render report")?
    );

    match report {
        ExecutionReport::Success(_) => Ok(()),
        ExecutionReport::Error(error) => {
            if !ctx.quiet {
                ui::error(&format!(
                    "Operation {} failed in {} phase",
                    error.operation_id, error.error_phase
                ));
            }
            bail!("{}", error.message)
        }
    }
}

/// Build the arguments, look the operator up and drive it, cancelling on Ctrl-C.
async fn execute(
    registry: &Registry,
    operation_id: &str,
    args: RunArgs,
) -> Result<ExecutionReport> {
    let arguments = build_arguments(&args)?;
    let builder = registry.get_operator_builder(&args.operator)?;
    let executor = builder(operation_id, arguments);
    log::info!("Running {} as {operation_id}", args.operator);

    let cancel = hostexec::Context::new();
    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling operation");
                cancel.cancel();
            }
        })
    };

    let report = executor.run(&cancel).await;
    signal.abort();
    Ok(report)
}

/// `--args-json` first, then every `--arg` on top.
fn build_arguments(args: &RunArgs) -> Result<Arguments> {
    let mut arguments = match &args.args_json {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("Invalid --args-json value")?;
            match value {
                serde_json::Value::Object(map) => map,
                _ => bail!("--args-json must be a JSON object"),
            }
        }
        None => Arguments::new(),
    };
    for (key, value) in &args.args {
        arguments.insert(key.clone(), value.clone());
    }
    Ok(arguments)
}
