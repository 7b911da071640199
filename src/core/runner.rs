// src/core/runner.rs

use crate::core::models::{round_secs, Finding, Metadata, ModuleResult, ModuleStatus, Severity};
use crate::core::scanner::ProbeModule;
use crate::core::target::Target;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Executes one probing module with failure isolation.
///
/// The probe runs in its own task, so a returned error, a panic or an
/// exceeded deadline all end up as a `failed` [`ModuleResult`] instead of
/// reaching the caller.
#[derive(Debug, Clone, Copy)]
pub struct ModuleRunner {
    deadline: Duration,
}

impl ModuleRunner {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub async fn run(&self, module: Arc<dyn ProbeModule>, target: &Target) -> ModuleResult {
        let module_name = module.name();
        let category = module.category();
        info!(module = module_name, target = %target, "Running module.");

        let started = Instant::now();
        let owned_target = target.clone();
        let mut handle = tokio::spawn(async move { module.scan(&owned_target).await });

        let outcome = match tokio::time::timeout(self.deadline, &mut handle).await {
            Ok(Ok(Ok(outcome))) => Ok(outcome),
            Ok(Ok(Err(e))) => {
                warn!(module = module_name, error = %e, "Module returned an error.");
                Err(e.to_string())
            }
            Ok(Err(join_error)) => {
                error!(module = module_name, error = %join_error, "Module task panicked or was cancelled.");
                Err(format!("module task aborted: {join_error}"))
            }
            Err(_) => {
                handle.abort();
                warn!(module = module_name, deadline = ?self.deadline, "Module exceeded its deadline.");
                Err(format!("module exceeded its deadline of {:?}", self.deadline))
            }
        };
        let execution_time = round_secs(started.elapsed().as_secs_f64());

        match outcome {
            Ok(outcome) => {
                debug!(
                    module = module_name,
                    status = %outcome.status,
                    findings = outcome.findings.len(),
                    execution_time,
                    "Module finished."
                );
                ModuleResult {
                    module_name: module_name.to_string(),
                    status: outcome.status,
                    findings: outcome.findings,
                    metadata: outcome.metadata,
                    execution_time,
                }
            }
            Err(message) => {
                let finding = Finding::new(
                    category,
                    Severity::High,
                    format!("Error while running {module_name}"),
                    message.clone(),
                    0,
                );
                let mut metadata = Metadata::new();
                metadata.insert("error".into(), Value::String(message));
                ModuleResult {
                    module_name: module_name.to_string(),
                    status: ModuleStatus::Failed,
                    findings: vec![finding],
                    metadata,
                    execution_time,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProbeError;
    use crate::core::models::Category;
    use crate::core::scanner::ModuleOutcome;
    use async_trait::async_trait;
    use serde_json::json;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
        Hang,
    }

    struct FakeModule(Behaviour);

    #[async_trait]
    impl ProbeModule for FakeModule {
        fn name(&self) -> &'static str {
            "Fake Module"
        }

        fn category(&self) -> Category {
            Category::Network
        }

        async fn scan(&self, _target: &Target) -> Result<ModuleOutcome, ProbeError> {
            match self.0 {
                Behaviour::Succeed => {
                    let finding = Finding::new(Category::Network, Severity::High, "Redis exposed", "d", 20);
                    let mut metadata = Metadata::new();
                    metadata.insert("open_ports".into(), json!([6379]));
                    Ok(ModuleOutcome::success(vec![finding], metadata))
                }
                Behaviour::Fail => Err(ProbeError::Resolution {
                    host: "scan.example.com".into(),
                    reason: "no addresses returned".into(),
                }),
                Behaviour::Panic => panic!("probe blew up"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ModuleOutcome::default())
                }
            }
        }
    }

    fn target() -> Target {
        "example.com".parse().unwrap()
    }

    #[tokio::test]
    async fn wraps_a_successful_outcome() {
        let runner = ModuleRunner::new(Duration::from_secs(5));
        let result = runner.run(Arc::new(FakeModule(Behaviour::Succeed)), &target()).await;
        assert_eq!(result.module_name, "Fake Module");
        assert_eq!(result.status, ModuleStatus::Success);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.metadata["open_ports"], json!([6379]));
        assert!(result.execution_time >= 0.0);
    }

    #[tokio::test]
    async fn converts_a_probe_error_into_a_failed_result() {
        let runner = ModuleRunner::new(Duration::from_secs(5));
        let result = runner.run(Arc::new(FakeModule(Behaviour::Fail)), &target()).await;
        assert_eq!(result.status, ModuleStatus::Failed);
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.score_impact, 0);
        assert!(finding.description.contains("no addresses returned"));
        assert!(result.metadata["error"].as_str().unwrap().contains("scan.example.com"));
    }

    #[tokio::test]
    async fn isolates_a_panicking_probe() {
        let runner = ModuleRunner::new(Duration::from_secs(5));
        let result = runner.run(Arc::new(FakeModule(Behaviour::Panic)), &target()).await;
        assert_eq!(result.status, ModuleStatus::Failed);
        assert_eq!(result.findings.len(), 1);
        assert!(result.metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn enforces_the_module_deadline() {
        let runner = ModuleRunner::new(Duration::from_millis(50));
        let result = runner.run(Arc::new(FakeModule(Behaviour::Hang)), &target()).await;
        assert_eq!(result.status, ModuleStatus::Failed);
        assert!(result.findings[0].description.contains("deadline"));
        assert!(result.execution_time < 5.0);
    }
}
