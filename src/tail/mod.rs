pub mod feed;
pub mod monitor;

pub use feed::{channel_feed, ChangeFeed, ChangeNotice, ChangeTrigger, ChannelFeed, FeedError, NotifyFeed};
pub use monitor::{MonitorExit, TailMonitor};
