//! git2-backed [`VersionControl`] for the site repository.
//!
//! The repository is opened per call; no handle is kept between operations.
//! Pushing authenticates with a personal access token sent as HTTP basic auth
//! (`token:<secret>`), which is what the common forges accept. Remotes on the
//! local filesystem need no credentials.

use super::backend::{VcsError, VersionControl};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions, RemoteCallbacks, Repository,
    Signature,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Commit author written into every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// What [`GitRepository::sync`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SyncOutcome {
    Cloned { url: String, path: PathBuf },
    Pulled { branch: String },
}

#[derive(Debug, Clone)]
pub struct GitRepository {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    token: Option<String>,
    author: Author,
}

impl From<git2::Error> for VcsError {
    fn from(e: git2::Error) -> Self {
        VcsError::Repository(e.message().to_string())
    }
}

impl GitRepository {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
            branch: branch.into(),
            token: None,
            author,
        }
    }

    /// Authenticate pushes and fetches with an access token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    pub fn exists(&self) -> bool {
        self.repo_dir.exists()
    }

    pub fn open(&self) -> Result<Repository, VcsError> {
        Ok(Repository::open(&self.repo_dir)?)
    }

    /// Single-branch clone of `url` into the working tree directory.
    pub fn clone_from(&self, url: &str) -> Result<(), VcsError> {
        info!(url, dir = %self.repo_dir.display(), branch = %self.branch, "cloning repository");
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(self.callbacks());
        RepoBuilder::new()
            .branch(&self.branch)
            .fetch_options(fetch)
            .clone(url, &self.repo_dir)?;
        self.assign_author()
    }

    /// Clone from `url` when the working tree is missing, otherwise
    /// fast-forward it.
    pub fn sync(&self, url: Option<&str>) -> Result<SyncOutcome, VcsError> {
        if self.exists() {
            self.pull()?;
            self.assign_author()?;
            return Ok(SyncOutcome::Pulled {
                branch: self.branch.clone(),
            });
        }
        let url = url.ok_or_else(|| {
            VcsError::Repository(format!(
                "{} does not exist and no clone url is configured",
                self.repo_dir.display()
            ))
        })?;
        self.clone_from(url)?;
        Ok(SyncOutcome::Cloned {
            url: url.to_string(),
            path: self.repo_dir.clone(),
        })
    }

    /// Record the configured author in the repository's local config.
    pub fn assign_author(&self) -> Result<(), VcsError> {
        let repo = self.open()?;
        let mut config = repo.config()?;
        config.set_str("user.name", &self.author.name)?;
        config.set_str("user.email", &self.author.email)?;
        Ok(())
    }

    /// Fetch the branch and fast-forward the working tree to it.
    pub fn pull(&self) -> Result<(), VcsError> {
        let repo = self.open()?;
        let mut remote = repo.find_remote(&self.remote)?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(self.callbacks());
        remote.fetch(&[self.branch.as_str()], Some(&mut fetch), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;
        if analysis.is_up_to_date() {
            debug!("already up to date");
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(VcsError::Repository(format!(
                "local {} has diverged from {}; refusing to merge",
                self.branch, self.remote
            )));
        }

        let refname = format!("refs/heads/{}", self.branch);
        match repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(incoming.id(), "postsmith: fast-forward")?;
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                repo.reference(&refname, incoming.id(), true, "postsmith: fast-forward")?;
            }
            Err(e) => return Err(e.into()),
        }
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        info!(commit = %incoming.id(), "fast-forwarded");
        Ok(())
    }

    /// Stage everything under `pathspec`, deletions included.
    pub fn stage_all(&self, pathspec: &Path) -> Result<(), VcsError> {
        let repo = self.open()?;
        let rel = self.relative(pathspec)?;
        let mut index = repo.index()?;
        index.add_all(std::iter::once(rel.as_path()), IndexAddOption::DEFAULT, None)?;
        index.update_all(std::iter::once(rel.as_path()), None)?;
        index.write()?;
        Ok(())
    }

    /// Commit the index on top of HEAD.
    pub fn commit(&self, message: &str) -> Result<Oid, VcsError> {
        let repo = self.open()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let unchanged = match &parent {
            Some(commit) => commit.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(VcsError::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = Signature::now(&self.author.name, &self.author.email)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        info!(commit = %oid, message, "committed");
        Ok(oid)
    }

    /// Push the branch to the remote.
    pub fn push(&self) -> Result<(), VcsError> {
        let repo = self.open()?;
        let mut remote = repo.find_remote(&self.remote)?;
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", self.branch);

        let mut rejected: Option<String> = None;
        let mut callbacks = self.callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(reason) = status {
                rejected = Some(format!("{refname}: {reason}"));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut options))?;
        drop(options);

        if let Some(reason) = rejected {
            return Err(VcsError::Repository(format!("push rejected: {reason}")));
        }
        info!(remote = %self.remote, branch = %self.branch, "pushed");
        Ok(())
    }

    fn callbacks<'cb>(&self) -> RemoteCallbacks<'cb> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = self.token.clone() {
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext("token", &token)
            });
        }
        callbacks
    }

    /// Repository-relative form of `path`.
    fn relative(&self, path: &Path) -> Result<PathBuf, VcsError> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        path.strip_prefix(&self.repo_dir)
            .map(Path::to_path_buf)
            .map_err(|_| VcsError::OutsideWorkTree(path.to_path_buf()))
    }
}

impl VersionControl for GitRepository {
    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        let rel = self.relative(path)?;
        if !self.repo_dir.join(&rel).exists() {
            return Err(VcsError::MissingFile(rel));
        }
        let repo = self.open()?;
        let mut index = repo.index()?;
        index.add_path(&rel)?;
        index.write()?;
        debug!(path = %rel.display(), "staged");
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), VcsError> {
        let rel = self.relative(path)?;
        let repo = self.open()?;
        let mut index = repo.index()?;
        index.remove_path(&rel)?;
        index.write()?;

        let on_disk = self.repo_dir.join(&rel);
        if on_disk.is_file() {
            std::fs::remove_file(&on_disk)?;
        }
        debug!(path = %rel.display(), "removed from index");
        Ok(())
    }

    fn commit_and_publish(&self, message: &str) -> Result<(), VcsError> {
        self.commit(message)?;
        self.push()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::RepositoryInitOptions;
    use std::fs;
    use tempfile::TempDir;

    fn author() -> Author {
        Author {
            name: "Test".into(),
            email: "test@example.com".into(),
        }
    }

    /// Working tree on `main` with a bare `origin` next to it.
    fn setup() -> (TempDir, GitRepository) {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        let bare = tmp.path().join("origin.git");

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(&work, &opts).unwrap();
        Repository::init_bare(&bare).unwrap();
        repo.remote("origin", bare.to_str().unwrap()).unwrap();

        (tmp, GitRepository::new(work, "origin", "main", author()))
    }

    fn write(git: &GitRepository, rel: &str, content: &str) {
        let path = git.repo_dir().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn head_files(git: &GitRepository) -> Vec<String> {
        let repo = git.open().unwrap();
        let tree = repo.head().unwrap().peel_to_tree().unwrap();
        let mut files = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                files.push(format!("{dir}{}", entry.name().unwrap()));
            }
            git2::TreeWalkResult::Ok
        })
        .unwrap();
        files.sort();
        files
    }

    #[test]
    fn stage_and_commit() {
        let (_tmp, git) = setup();
        write(&git, "content/posts/1.md", "hello");

        git.stage(Path::new("content/posts/1.md")).unwrap();
        git.commit("first").unwrap();

        assert_eq!(head_files(&git), vec!["content/posts/1.md"]);
    }

    #[test]
    fn stage_absolute_path() {
        let (_tmp, git) = setup();
        write(&git, "a.md", "a");

        git.stage(&git.repo_dir().join("a.md")).unwrap();
        git.commit("abs").unwrap();

        assert_eq!(head_files(&git), vec!["a.md"]);
    }

    #[test]
    fn stage_missing_file_fails() {
        let (_tmp, git) = setup();
        let result = git.stage(Path::new("nope.md"));
        assert!(matches!(result, Err(VcsError::MissingFile(_))));
    }

    #[test]
    fn stage_outside_work_tree_fails() {
        let (_tmp, git) = setup();
        let result = git.stage(Path::new("/definitely/elsewhere.md"));
        assert!(matches!(result, Err(VcsError::OutsideWorkTree(_))));
    }

    #[test]
    fn commit_on_empty_index_is_nothing_to_commit() {
        let (_tmp, git) = setup();
        assert!(matches!(git.commit("empty"), Err(VcsError::NothingToCommit)));
    }

    #[test]
    fn commit_without_new_changes_is_nothing_to_commit() {
        let (_tmp, git) = setup();
        write(&git, "a.md", "a");
        git.stage(Path::new("a.md")).unwrap();
        git.commit("first").unwrap();

        // Unstaged edits do not count
        write(&git, "a.md", "changed");
        assert!(matches!(git.commit("again"), Err(VcsError::NothingToCommit)));
    }

    #[test]
    fn remove_deletes_from_index_and_disk() {
        let (_tmp, git) = setup();
        write(&git, "a.md", "a");
        write(&git, "b.md", "b");
        git.stage(Path::new("a.md")).unwrap();
        git.stage(Path::new("b.md")).unwrap();
        git.commit("two").unwrap();

        git.remove(Path::new("a.md")).unwrap();
        git.commit("drop a").unwrap();

        assert_eq!(head_files(&git), vec!["b.md"]);
        assert!(!git.repo_dir().join("a.md").exists());
    }

    #[test]
    fn commit_and_publish_pushes_to_origin() {
        let (tmp, git) = setup();
        write(&git, "content/posts/9.md", "nine");
        git.stage(Path::new("content/posts/9.md")).unwrap();

        git.commit_and_publish("Add post 9").unwrap();

        let origin = Repository::open_bare(tmp.path().join("origin.git")).unwrap();
        let pushed = origin
            .find_reference("refs/heads/main")
            .unwrap()
            .peel_to_commit()
            .unwrap();
        assert_eq!(pushed.message(), Some("Add post 9"));
    }

    #[test]
    fn clone_then_pull_fast_forwards() {
        let (tmp, git) = setup();
        write(&git, "a.md", "a");
        git.stage(Path::new("a.md")).unwrap();
        git.commit_and_publish("seed").unwrap();

        let url = tmp.path().join("origin.git");
        let mirror = GitRepository::new(tmp.path().join("mirror"), "origin", "main", author());
        mirror.clone_from(url.to_str().unwrap()).unwrap();
        assert!(mirror.repo_dir().join("a.md").exists());

        write(&git, "b.md", "b");
        git.stage(Path::new("b.md")).unwrap();
        git.commit_and_publish("more").unwrap();

        mirror.pull().unwrap();
        assert!(mirror.repo_dir().join("b.md").exists());
        // A second pull has nothing to do
        mirror.pull().unwrap();
    }

    #[test]
    fn sync_clones_then_pulls() {
        let (tmp, git) = setup();
        write(&git, "a.md", "a");
        git.stage(Path::new("a.md")).unwrap();
        git.commit_and_publish("seed").unwrap();

        let url = tmp.path().join("origin.git");
        let url = url.to_str().unwrap();
        let mirror = GitRepository::new(tmp.path().join("mirror"), "origin", "main", author());

        assert!(matches!(
            mirror.sync(Some(url)).unwrap(),
            SyncOutcome::Cloned { .. }
        ));
        assert_eq!(
            mirror.sync(Some(url)).unwrap(),
            SyncOutcome::Pulled {
                branch: "main".into()
            }
        );
    }

    #[test]
    fn sync_without_url_or_tree_fails() {
        let tmp = TempDir::new().unwrap();
        let git = GitRepository::new(tmp.path().join("missing"), "origin", "main", author());
        assert!(matches!(git.sync(None), Err(VcsError::Repository(_))));
    }

    #[test]
    fn assign_author_writes_local_config() {
        let (_tmp, git) = setup();
        git.assign_author().unwrap();

        let config = git.open().unwrap().config().unwrap();
        assert_eq!(config.get_string("user.name").unwrap(), "Test");
        assert_eq!(config.get_string("user.email").unwrap(), "test@example.com");
    }

    #[test]
    fn stage_all_picks_up_new_and_deleted_files() {
        let (_tmp, git) = setup();
        write(&git, "posts/1.md", "1");
        write(&git, "posts/2.md", "2");
        git.stage_all(Path::new("posts")).unwrap();
        git.commit("both").unwrap();

        fs::remove_file(git.repo_dir().join("posts/1.md")).unwrap();
        write(&git, "posts/3.md", "3");
        git.stage_all(Path::new("posts")).unwrap();
        git.commit("swap").unwrap();

        assert_eq!(head_files(&git), vec!["posts/2.md", "posts/3.md"]);
    }
}
