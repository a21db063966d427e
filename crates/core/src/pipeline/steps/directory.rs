use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher, TreeEntry};
use crate::pipeline::context::{ScratchContext, StepError};
use crate::pipeline::parse::commentary;
use crate::pipeline::prompts;
use crate::pipeline::step::MetricStep;
use crate::summarizer::Summarizer;

/// Renders the full repository tree and comments on its layout.
///
/// The rendering is kept in the scratch context for file selection.
pub struct DirectoryStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    summarizer: Arc<dyn Summarizer>,
    max_depth: usize,
}

impl DirectoryStep {
    pub fn new(
        fetcher: Arc<dyn RepositoryFetcher>,
        summarizer: Arc<dyn Summarizer>,
        max_depth: usize,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            max_depth,
        }
    }

    /// Pre-order rendering, one `-- path sha` line per entry, tab-indented by depth.
    fn render<'a>(
        &'a self,
        repo: &'a RepositoryDescriptor,
        token: &'a AccessToken,
        entries: Vec<TreeEntry>,
        depth: usize,
    ) -> BoxFuture<'a, String> {
        async move {
            let mut out = String::new();
            for entry in entries {
                out.push_str(&"\t".repeat(depth));
                out.push_str(&format!("-- {} {}\n", entry.path, entry.sha));

                if entry.is_dir() && depth + 1 < self.max_depth {
                    let children = self.fetcher.get_subtree(repo, token, &entry.sha).await;
                    out.push_str(&self.render(repo, token, children, depth + 1).await);
                }
            }
            out
        }
        .boxed()
    }
}

#[async_trait]
impl MetricStep for DirectoryStep {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let root = self.fetcher.get_repository_root_tree(repo, token).await;
        let tree = self.render(repo, token, root, 0).await;

        let response = self.summarizer.complete(&prompts::directory(&tree)).await;
        ctx.set_directory_tree(tree);
        Ok(StepOutput::Directory(commentary(&response)))
    }
}
