pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const PERSON: &str = "👤";
    pub const PHONE: &str = "📱";
    pub const MAIL: &str = "✉️";
    pub const BOOK: &str = "📚";
}
