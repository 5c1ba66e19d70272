use std::borrow::Cow;

use super::frame::{RawImageFrame, Rotation};

/// 解码原语给出的结果: 文本和二维码四角的大致位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedQr {
    pub text: String,
    pub corners: [(i32, i32); 4],
}

/// 二维码解码原语, 在一张像素图上查找并解码
pub trait QrDecoder: Send + Sync {
    fn decode(&self, frame: &RawImageFrame) -> Option<DecodedQr>;
}

/// 基于 rqrr 的默认解码原语
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &RawImageFrame) -> Option<DecodedQr> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.luma(x as u32, y as u32),
        );

        // 同一方向上有多个码时取第一个能解出的
        prepared.detect_grids().into_iter().find_map(|grid| {
            let corners = grid.bounds.map(|p| (p.x, p.y));
            match grid.decode() {
                Ok((_meta, text)) => Some(DecodedQr { text, corners }),
                Err(e) => {
                    tracing::debug!("检测到二维码但解码失败: {:?}", e);
                    None
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    Found { text: String, rotation: Rotation },
    NotFound,
}

impl DecodeResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            DecodeResult::Found { text, .. } => Some(text),
            DecodeResult::NotFound => None,
        }
    }
}

/// 二维码定位: 原方向解不出时依次尝试 90/180/270 度
pub struct QrLocator<D = RqrrDecoder> {
    decoder: D,
}

impl QrLocator<RqrrDecoder> {
    pub fn new() -> Self {
        Self::with_decoder(RqrrDecoder)
    }
}

impl Default for QrLocator<RqrrDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: QrDecoder> QrLocator<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// 按 0 -> 90 -> 180 -> 270 的固定顺序尝试, 第一个成功的方向胜出
    ///
    /// 空图直接返回 `NotFound`, 不调用解码原语。旋转副本用完即丢。
    pub fn locate(&self, frame: RawImageFrame) -> DecodeResult {
        if frame.is_empty() {
            tracing::debug!("空图像 {}x{}, 跳过识别", frame.width(), frame.height());
            return DecodeResult::NotFound;
        }

        for rotation in Rotation::SEARCH_ORDER {
            let candidate = match rotation {
                Rotation::Deg0 => Cow::Borrowed(&frame),
                other => Cow::Owned(frame.rotated(other)),
            };

            if let Some(decoded) = self.decoder.decode(&candidate) {
                tracing::info!(
                    rotation = rotation.degrees(),
                    corners = ?decoded.corners,
                    "QR code decoded"
                );
                return DecodeResult::Found {
                    text: decoded.text,
                    rotation,
                };
            }
        }

        tracing::info!("No QR code detected at any orientation");
        DecodeResult::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const MARK: [u8; 4] = [255, 0, 0, 255];
    const PAPER: [u8; 4] = [255, 255, 255, 255];

    /// 只有当左上角是标记像素时才"识别"成功, 并记录每次尝试的尺寸
    #[derive(Default)]
    struct CornerMarkDecoder {
        attempts: Mutex<Vec<(u32, u32)>>,
    }

    impl QrDecoder for CornerMarkDecoder {
        fn decode(&self, frame: &RawImageFrame) -> Option<DecodedQr> {
            self.attempts
                .lock()
                .unwrap()
                .push((frame.width(), frame.height()));
            (frame.pixel(0, 0) == MARK).then(|| DecodedQr {
                text: "https://receipts.example/r/42".to_string(),
                corners: [(0, 0); 4],
            })
        }
    }

    /// 宽 4 高 2, 标记放在 (x, y)
    fn frame_with_mark(x: u32, y: u32) -> RawImageFrame {
        let mut rgba = Vec::new();
        for py in 0..2 {
            for px in 0..4 {
                rgba.extend_from_slice(if (px, py) == (x, y) { &MARK } else { &PAPER });
            }
        }
        RawImageFrame::new(4, 2, rgba).unwrap()
    }

    fn locate_with_stub(frame: RawImageFrame) -> (DecodeResult, Vec<(u32, u32)>) {
        let locator = QrLocator::with_decoder(CornerMarkDecoder::default());
        let result = locator.locate(frame);
        let attempts = locator.decoder.attempts.lock().unwrap().clone();
        (result, attempts)
    }

    #[test]
    fn native_orientation_wins_without_rotating() {
        let (result, attempts) = locate_with_stub(frame_with_mark(0, 0));
        assert_eq!(
            result,
            DecodeResult::Found {
                text: "https://receipts.example/r/42".to_string(),
                rotation: Rotation::Deg0
            }
        );
        assert_eq!(attempts, vec![(4u32, 2u32)]);
    }

    #[test]
    fn each_orientation_is_found_in_fixed_order() {
        // 标记位于哪个角, 就需要转多少才能回到左上角
        let cases = [
            ((0, 1), Rotation::Deg90, 2),
            ((3, 1), Rotation::Deg180, 3),
            ((3, 0), Rotation::Deg270, 4),
        ];

        for ((x, y), expected, tries) in cases {
            let (result, attempts) = locate_with_stub(frame_with_mark(x, y));
            assert_eq!(
                result,
                DecodeResult::Found {
                    text: "https://receipts.example/r/42".to_string(),
                    rotation: expected
                },
                "mark at ({}, {})",
                x,
                y
            );
            assert_eq!(attempts.len(), tries);
            // 90/270 时宽高互换
            let expected_dims: [(u32, u32); 4] = [(4, 2), (2, 4), (4, 2), (2, 4)];
            assert_eq!(attempts[..], expected_dims[..tries]);
        }
    }

    #[test]
    fn no_code_tries_all_four_then_gives_up() {
        let (result, attempts) = locate_with_stub(frame_with_mark(1, 0));
        assert_eq!(result, DecodeResult::NotFound);
        assert_eq!(attempts.len(), 4);
    }

    #[test]
    fn empty_frame_never_reaches_decoder() {
        let (result, attempts) = locate_with_stub(RawImageFrame::new(0, 0, Vec::new()).unwrap());
        assert_eq!(result, DecodeResult::NotFound);
        assert!(attempts.is_empty());
    }

    #[test]
    fn full_turn_matches_unrotated_frame() {
        let frame = frame_with_mark(3, 1);
        let turned = frame.rotated(Rotation::from_degrees(360));
        assert_eq!(locate_with_stub(turned).0, locate_with_stub(frame).0);
    }

    // 以下用真实二维码图像

    /// 每个模块 4 像素, 四周留 4 个模块的静区
    fn render_qr(text: &str) -> RawImageFrame {
        let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
        let modules = code.width();
        let colors = code.to_colors();
        let scale = 4;
        let quiet = 4;
        let side = (modules + 2 * quiet) * scale;

        let mut rgba = Vec::with_capacity(side * side * 4);
        for y in 0..side {
            for x in 0..side {
                let (mx, my) = (x / scale, y / scale);
                let dark = mx >= quiet
                    && my >= quiet
                    && mx < quiet + modules
                    && my < quiet + modules
                    && colors[(my - quiet) * modules + (mx - quiet)] == qrcode::Color::Dark;
                let v = if dark { 0 } else { 255 };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RawImageFrame::new(side as u32, side as u32, rgba).unwrap()
    }

    #[test]
    fn real_decoder_reads_generated_code() {
        let url = "https://suf.purs.gov.rs/v/?vl=A1B2C3";
        let locator = QrLocator::new();
        let result = locator.locate(render_qr(url));
        assert_eq!(result.text(), Some(url));
    }

    #[test]
    fn real_decoder_reads_turned_code_without_retry() {
        // rqrr 本身不受方向影响, 转过的码在原方向就能解出
        let url = "https://receipts.example/r/rotated";
        let locator = QrLocator::new();
        for turn in Rotation::SEARCH_ORDER {
            let frame = render_qr(url).rotated(turn);
            assert_eq!(
                locator.locate(frame),
                DecodeResult::Found {
                    text: url.to_string(),
                    rotation: Rotation::Deg0
                },
                "input turned {:?}",
                turn
            );
        }
    }

    /// 只接受竖版图的 rqrr, 横版图需要转 90 度后才能识别
    struct PortraitOnly(RqrrDecoder);

    impl QrDecoder for PortraitOnly {
        fn decode(&self, frame: &RawImageFrame) -> Option<DecodedQr> {
            if frame.width() > frame.height() {
                return None;
            }
            self.0.decode(frame)
        }
    }

    /// 右侧补白, 得到横版图
    fn widen(frame: &RawImageFrame, extra: u32) -> RawImageFrame {
        let width = frame.width() + extra;
        let mut rgba = Vec::with_capacity((width * frame.height() * 4) as usize);
        for y in 0..frame.height() {
            for x in 0..width {
                if x < frame.width() {
                    rgba.extend_from_slice(&frame.pixel(x, y));
                } else {
                    rgba.extend_from_slice(&PAPER);
                }
            }
        }
        RawImageFrame::new(width, frame.height(), rgba).unwrap()
    }

    #[test]
    fn real_decoder_succeeds_on_retried_orientation() {
        let url = "https://receipts.example/r/landscape";
        let landscape = widen(&render_qr(url), 40);
        assert!(landscape.width() > landscape.height());

        let locator = QrLocator::with_decoder(PortraitOnly(RqrrDecoder));
        assert_eq!(
            locator.locate(landscape),
            DecodeResult::Found {
                text: url.to_string(),
                rotation: Rotation::Deg90
            }
        );
    }

    #[test]
    fn real_decoder_finds_nothing_on_blank_paper() {
        let blank = RawImageFrame::new(64, 48, [255u8; 4].repeat(64 * 48)).unwrap();
        assert_eq!(QrLocator::new().locate(blank), DecodeResult::NotFound);
    }
}
