use envconfig::Envconfig;

use crate::lifecycle::KarmaPoints;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "postgresql://localhost/campus_forum")]
    pub database_url: String,

    #[envconfig(from = "FORUM_BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: String,

    #[envconfig(from = "FORUM_DB_MAX_CONNECTIONS", default = "10")]
    pub db_max_connections: u32,

    #[envconfig(from = "FORUM_JWT_SECRET", default = "change-me-in-production")]
    pub jwt_secret: String,

    #[envconfig(from = "FORUM_UPLOAD_DIR", default = "./uploads")]
    pub upload_dir: String,

    #[envconfig(from = "FORUM_UPLOAD_BASE_URL", default = "/uploads")]
    pub upload_base_url: String,

    #[envconfig(from = "KARMA_CREATE_THREAD_PTS", default = "10")]
    pub create_thread_pts: i64,

    #[envconfig(from = "KARMA_CREATE_POST_PTS", default = "5")]
    pub create_post_pts: i64,

    #[envconfig(from = "KARMA_CREATE_ARTICLE_PTS", default = "10")]
    pub create_article_pts: i64,

    #[envconfig(from = "KARMA_CREATE_COMMENT_PTS", default = "2")]
    pub create_comment_pts: i64,

    #[envconfig(from = "KARMA_LIKE_PTS", default = "1")]
    pub like_pts: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }

    pub fn karma_points(&self) -> KarmaPoints {
        KarmaPoints {
            create_thread: self.create_thread_pts,
            create_post: self.create_post_pts,
            create_article: self.create_article_pts,
            create_comment: self.create_comment_pts,
            like: self.like_pts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_built_in_karma_points() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.karma_points(), KarmaPoints::default());
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn karma_points_are_overridable() {
        let mut env = HashMap::new();
        env.insert("KARMA_LIKE_PTS".to_string(), "3".to_string());
        let config = Config::init_from_hashmap(&env).unwrap();
        assert_eq!(config.karma_points().like, 3);
    }
}
