use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported image: {0}")]
    Image(#[from] image::ImageError),
}

/// 顺时针旋转角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// 识别时的尝试顺序, 先成功者胜出
    pub const SEARCH_ORDER: [Rotation; 4] =
        [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// 任意整数角度按 90 度取整到最近的象限, 360 即恒等
    pub fn from_degrees(degrees: i32) -> Rotation {
        let quarter_turns = ((degrees as f64 / 90.0).round() as i64).rem_euclid(4);
        match quarter_turns {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }
}

/// RGBA 像素缓冲, 行优先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImageFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RawImageFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// 解码上传的 PNG/JPEG
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::new(width, height, decoded.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ]
    }

    /// 亮度 (BT.601), 透明像素按白底合成
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let [r, g, b, a] = self.pixel(x, y);
        let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
        let alpha = a as u32;
        ((luma * alpha + 255 * (255 - alpha)) / 255) as u8
    }

    /// 绕图像中心顺时针旋转, 90/270 度时宽高互换
    pub fn rotated(&self, rotation: Rotation) -> RawImageFrame {
        let (w, h) = (self.width, self.height);
        let (out_w, out_h) = match rotation {
            Rotation::Deg0 | Rotation::Deg180 => (w, h),
            Rotation::Deg90 | Rotation::Deg270 => (h, w),
        };

        let mut rgba = Vec::with_capacity(self.rgba.len());
        for y in 0..out_h {
            for x in 0..out_w {
                let (src_x, src_y) = match rotation {
                    Rotation::Deg0 => (x, y),
                    Rotation::Deg90 => (y, h - 1 - x),
                    Rotation::Deg180 => (w - 1 - x, h - 1 - y),
                    Rotation::Deg270 => (w - 1 - y, x),
                };
                rgba.extend_from_slice(&self.pixel(src_x, src_y));
            }
        }

        RawImageFrame {
            width: out_w,
            height: out_h,
            rgba,
        }
    }
}
