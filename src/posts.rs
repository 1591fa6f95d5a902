use crate::error::{Result, SweeperError};
use chrono::{DateTime, Utc};
use log::{error, info};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Avatars handed to commenters who do not pick one
pub const AVATARS: &[&str] = &["🦊", "🐼", "🐧", "🐙", "🦉", "🐢", "🦄", "🐝"];

/// A comment left on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub avatar: String,
}

/// A post on the board
///
/// Optional fields default when absent so older post files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Data needed to create a post
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Flat JSON file holding every post
///
/// Each mutation reads the whole file, changes it and writes it back.
/// Mutations on one store are serialized by a mutex and the file is
/// replaced atomically, so concurrent writers through the same store never
/// lose updates.
pub struct PostStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PostStore {
    /// Open the store at `path`, creating an empty `[]` file if needed
    ///
    /// # Errors
    /// * `Io` if the directory or file cannot be created
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            info!("Posts file {} does not exist, creating it", path.display());
            fs::write(&path, "[]")?;
        }

        Ok(PostStore {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All posts, in the order they were created
    pub fn list(&self) -> Result<Vec<Post>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_all()
    }

    /// A single post by id
    pub fn get(&self, id: u64) -> Result<Post> {
        self.list()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| SweeperError::NotFound(format!("post {}", id)))
    }

    /// Create a post and persist it
    ///
    /// The new id is one more than the largest existing id, so ids stay
    /// unique even after posts are removed from the file by hand.
    ///
    /// # Errors
    /// * `Validation` if the title or content is blank
    pub fn create(&self, new_post: NewPost) -> Result<Post> {
        let title = new_post.title.trim();
        let content = new_post.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(SweeperError::Validation(
                "Title and content cannot be empty".to_string(),
            ));
        }

        self.mutate(|posts| {
            let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            let post = Post {
                id,
                title: title.to_string(),
                content: content.to_string(),
                image: new_post.image.clone(),
                likes: 0,
                comments: Vec::new(),
                created_at: Some(Utc::now()),
            };
            posts.push(post.clone());
            info!("Created post {}", id);
            Ok(post)
        })
    }

    /// Add one like to a post
    pub fn like(&self, id: u64) -> Result<Post> {
        self.mutate(|posts| {
            let post = find_mut(posts, id)?;
            post.likes += 1;
            Ok(post.clone())
        })
    }

    /// Append a comment to a post
    ///
    /// A random avatar from [`AVATARS`] is used when none is given.
    pub fn comment(&self, id: u64, text: &str, avatar: Option<&str>) -> Result<Post> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SweeperError::Validation("Comment cannot be empty".to_string()));
        }
        let avatar = match avatar.map(str::trim).filter(|a| !a.is_empty()) {
            Some(a) => a.to_string(),
            None => random_avatar(),
        };

        self.mutate(|posts| {
            let post = find_mut(posts, id)?;
            post.comments.push(Comment {
                text: text.to_string(),
                avatar: avatar.clone(),
            });
            Ok(post.clone())
        })
    }

    fn read_all(&self) -> Result<Vec<Post>> {
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            error!("Failed to parse posts file {}: {}", self.path.display(), e);
            SweeperError::Json(e)
        })
    }

    fn write_all(&self, posts: &[Post]) -> Result<()> {
        let json = serde_json::to_string_pretty(posts)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| SweeperError::Io(e.error))?;
        Ok(())
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Vec<Post>) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut posts = self.read_all()?;
        let result = change(&mut posts)?;
        self.write_all(&posts)?;
        Ok(result)
    }
}

fn find_mut(posts: &mut [Post], id: u64) -> Result<&mut Post> {
    posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| SweeperError::NotFound(format!("post {}", id)))
}

fn random_avatar() -> String {
    AVATARS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("🙂")
        .to_string()
}
