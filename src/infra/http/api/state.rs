use std::sync::Arc;

use crate::application::chat::ChatService;
use crate::application::comments::CommentService;
use crate::application::posts::PostService;
use crate::cache::{CacheConfig, CacheStore, RateLimiter};

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub chat: Arc<ChatService>,
    pub cache: Arc<CacheStore>,
    pub cache_config: CacheConfig,
    pub api_limiter: Arc<RateLimiter>,
    pub write_limiter: Arc<RateLimiter>,
}
