//! Synchronous, time-bounded entry point into an async generator.
//!
//! Workers are plain threads. The invoker owns a small tokio runtime and
//! blocks on one generation call at a time per caller.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Runtime;

use super::{GeneratedReport, ReportGenerator};
use crate::error::GenerationError;

/// Default per-request generation timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GenerationInvoker {
    generator: Arc<dyn ReportGenerator>,
    runtime: Runtime,
    timeout: Duration,
}

impl GenerationInvoker {
    /// Builds an invoker with its own multi-threaded runtime.
    pub fn new(
        generator: Arc<dyn ReportGenerator>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("thinkcal-generation")
            .enable_all()
            .build()
            .map_err(GenerationError::Runtime)?;

        Ok(Self {
            generator,
            runtime,
            timeout,
        })
    }

    /// Runs one generation call, failing with [`GenerationError::Timeout`]
    /// if it does not finish in time.
    ///
    /// Must not be called from inside an async context.
    pub fn generate(&self, prompt: &str) -> Result<GeneratedReport, GenerationError> {
        debug!("Invoking generator ({} prompt chars)", prompt.chars().count());
        let call = self.generator.generate(prompt);
        match self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, call).await })
        {
            Ok(result) => result,
            Err(_) => {
                warn!("Generation timed out after {:?}", self.timeout);
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ReportGenerator for Echo {
        async fn generate(&self, prompt: &str) -> Result<GeneratedReport, GenerationError> {
            Ok(GeneratedReport {
                content: prompt.to_uppercase(),
                abstract_text: "echo".to_string(),
            })
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl ReportGenerator for Slow {
        async fn generate(&self, _prompt: &str) -> Result<GeneratedReport, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok(GeneratedReport {
                content: "late".to_string(),
                abstract_text: String::new(),
            })
        }
    }

    #[test]
    fn test_generate_passes_through_result() {
        let invoker = GenerationInvoker::new(Arc::new(Echo), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let out = invoker.generate("abc").unwrap();
        assert_eq!(out.content, "ABC");
        assert_eq!(out.abstract_text, "echo");
    }

    #[test]
    fn test_generate_times_out() {
        let invoker = GenerationInvoker::new(
            Arc::new(Slow(Duration::from_secs(5))),
            Duration::from_millis(20),
        )
        .unwrap();
        let err = invoker.generate("abc").unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[test]
    fn test_generate_from_many_threads() {
        let invoker = Arc::new(GenerationInvoker::new(Arc::new(Echo), DEFAULT_REQUEST_TIMEOUT).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let invoker = Arc::clone(&invoker);
                std::thread::spawn(move || invoker.generate(&format!("p{}", i)).unwrap())
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap().content, format!("P{}", i));
        }
    }
}
