//! 视频谱面抽取器 - 从滚动谱面/六线谱视频中提取稳定画面
//!
//! 核心策略：
//! 1. 定间隔抽帧 - 一次 seek，之后逐帧解码跳过
//! 2. 高亮遮罩 - HSV 阈值屏蔽移动的彩色光标
//! 3. 掩码帧差 - 忽略两帧遮罩并集后的平均差值
//! 4. 状态机驱动 - 画面静止足够久后只截取一次
//! 5. 区域裁剪 - 最大外轮廓的外接矩形

pub mod diff_filter;
pub mod frame;
pub mod highlight;
pub mod pipeline;
pub mod region;
pub mod sampler;
pub mod state_machine;

pub use diff_filter::{ChangeDetector, ChangeScore};
pub use frame::{CapturedFrame, ExtractedRegion, FrameInfo, Roi, SampleFrame};
pub use highlight::{CleanFrame, HighlightConfig, HighlightMasker, Mask};
pub use pipeline::{CaptureExtractor, ExtractionConfig, ExtractionResult, RunStats};
pub use region::{ContourSource, RegionConfig, RegionExtractor};
pub use sampler::FrameSampler;
pub use state_machine::{StabilityConfig, StabilityState, StabilityTracker, TrackerAction};
