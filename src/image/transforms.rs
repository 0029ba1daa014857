use image::RgbImage;
use ndarray::Array3;

/// Placement of a source image inside a square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_width: u32,
    pub src_height: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub size: u32,
}

impl Letterbox {
    pub fn fit(src_width: u32, src_height: u32, size: u32) -> Self {
        let src_width = src_width.max(1);
        let src_height = src_height.max(1);

        let scale = (size as f32 / src_width as f32).min(size as f32 / src_height as f32);
        let new_w = ((src_width as f32 * scale) as u32).clamp(1, size);
        let new_h = ((src_height as f32 * scale) as u32).clamp(1, size);

        Self {
            scale,
            pad_x: ((size - new_w) / 2) as f32,
            pad_y: ((size - new_h) / 2) as f32,
            src_width,
            src_height,
            content_width: new_w,
            content_height: new_h,
            size,
        }
    }

    /// Map a point in model input pixels back to coordinates normalized by
    /// the source image size. Depth is normalized by the source width.
    pub fn unproject(&self, x: f32, y: f32, z: f32) -> [f32; 3] {
        [
            (x - self.pad_x) / self.scale / self.src_width as f32,
            (y - self.pad_y) / self.scale / self.src_height as f32,
            z / self.scale / self.src_width as f32,
        ]
    }
}

pub struct ImageTransforms;

impl ImageTransforms {
    /// Aspect-preserving bilinear resize into a `size`×`size` HWC array with
    /// values in [0, 1]. Padding is black.
    pub fn letterbox(image: &RgbImage, size: u32) -> (Array3<f32>, Letterbox) {
        let (orig_w, orig_h) = image.dimensions();
        let letterbox = Letterbox::fit(orig_w, orig_h, size);
        let target = size as usize;
        let mut resized = Array3::<f32>::zeros((target, target, 3));

        if orig_w == 0 || orig_h == 0 {
            return (resized, letterbox);
        }

        let new_w = letterbox.content_width as usize;
        let new_h = letterbox.content_height as usize;
        let offset_x = letterbox.pad_x as usize;
        let offset_y = letterbox.pad_y as usize;
        let (max_x, max_y) = (orig_w - 1, orig_h - 1);

        for h in 0..new_h {
            for w in 0..new_w {
                let src_h = (h as f32 / letterbox.scale).min(max_y as f32);
                let src_w = (w as f32 / letterbox.scale).min(max_x as f32);

                let h1 = src_h.floor() as u32;
                let h2 = (h1 + 1).min(max_y);
                let w1 = src_w.floor() as u32;
                let w2 = (w1 + 1).min(max_x);

                let dh = src_h - h1 as f32;
                let dw = src_w - w1 as f32;

                let p11 = image.get_pixel(w1, h1);
                let p12 = image.get_pixel(w2, h1);
                let p21 = image.get_pixel(w1, h2);
                let p22 = image.get_pixel(w2, h2);

                for c in 0..3 {
                    let interpolated = p11[c] as f32 * (1.0 - dh) * (1.0 - dw)
                        + p12[c] as f32 * (1.0 - dh) * dw
                        + p21[c] as f32 * dh * (1.0 - dw)
                        + p22[c] as f32 * dh * dw;

                    resized[[h + offset_y, w + offset_x, c]] = interpolated / 255.0;
                }
            }
        }

        (resized, letterbox)
    }
}
