pub mod box_score;
pub mod garbage_time;
pub mod history;
pub mod http_client;
pub mod model;
pub mod nba_client;
pub mod stats_cache;
pub mod team_total;
pub mod threshold;
