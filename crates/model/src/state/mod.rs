pub mod cursor;
pub mod watermark;
