//! Content stream interpreter collecting positioned glyphs and path segments.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use tracing::trace;

use super::fonts::FontInfo;
use super::{number, resolve};
use crate::models::page::Segment;

const MAX_FORM_DEPTH: usize = 8;

/// Affine transform `[a b c d e f]`, row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f64> = operands.iter().map(number).collect::<Option<_>>()?;
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self` applied first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// A glyph box in top-down page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
enum SubPath {
    Polyline { points: Vec<(f64, f64)>, curved: bool },
    Rect([(f64, f64); 4]),
}

/// Everything drawn on one page.
#[derive(Debug, Default)]
pub struct PageObjects {
    pub glyphs: Vec<Glyph>,
    pub lines: Vec<Segment>,
    pub rects: Vec<Segment>,
}

/// Walks content streams, following form XObjects.
pub struct Interpreter<'a> {
    doc: &'a Document,
    page_height: f64,
    fonts: HashMap<Vec<u8>, FontInfo>,
    objects: PageObjects,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: &'a Document, page_height: f64) -> Self {
        Self {
            doc,
            page_height,
            fonts: HashMap::new(),
            objects: PageObjects::default(),
        }
    }

    pub fn finish(self) -> PageObjects {
        self.objects
    }

    pub fn run(&mut self, content: &Content, resources: Option<&Dictionary>, ctm: Matrix) {
        self.run_at_depth(&content.operations, resources, ctm, 0);
    }

    fn run_at_depth(
        &mut self,
        operations: &[Operation],
        resources: Option<&Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) {
        // Font names are scoped to a resource dictionary.
        let saved_fonts = std::mem::take(&mut self.fonts);
        self.load_fonts(resources);

        let mut state = GraphicsState::new(ctm);
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::identity();
        let mut tlm = Matrix::identity();
        let mut path: Vec<SubPath> = Vec::new();

        for op in operations {
            let args = &op.operands;
            let num = |i: usize| args.get(i).and_then(number);

            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(args) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }

                "BT" => {
                    tm = Matrix::identity();
                    tlm = Matrix::identity();
                }
                "ET" => {}
                "Tf" => {
                    state.font = args.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
                    state.font_size = num(1).unwrap_or(0.0);
                }
                "Tc" => state.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => state.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => state.h_scale = num(0).unwrap_or(100.0) / 100.0,
                "TL" => state.leading = num(0).unwrap_or(0.0),
                "Ts" => state.rise = num(0).unwrap_or(0.0),
                "Td" | "TD" => {
                    let (tx, ty) = (num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    tlm = Matrix::translation(tx, ty).multiply(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(args) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -state.leading).multiply(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show(bytes, &state, &mut tm);
                    }
                }
                "'" | "\"" => {
                    if op.operator == "\"" {
                        state.word_spacing = num(0).unwrap_or(state.word_spacing);
                        state.char_spacing = num(1).unwrap_or(state.char_spacing);
                    }
                    tlm = Matrix::translation(0.0, -state.leading).multiply(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = args.last() {
                        self.show(bytes, &state, &mut tm);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = args.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes, &state, &mut tm),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        let tx = -adjust / 1000.0 * state.font_size * state.h_scale;
                                        tm = Matrix::translation(tx, 0.0).multiply(&tm);
                                    }
                                }
                            }
                        }
                    }
                }

                "m" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        path.push(SubPath::Polyline {
                            points: vec![state.ctm.apply(x, y)],
                            curved: false,
                        });
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        let point = state.ctm.apply(x, y);
                        if let Some(SubPath::Polyline { points, .. }) = path.last_mut() {
                            points.push(point);
                        }
                    }
                }
                "c" | "v" | "y" => {
                    let end = args.len().checked_sub(2).and_then(|i| Some((num(i)?, num(i + 1)?)));
                    if let (Some((x, y)), Some(SubPath::Polyline { points, curved })) =
                        (end, path.last_mut())
                    {
                        points.push(state.ctm.apply(x, y));
                        *curved = true;
                    }
                }
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (num(0), num(1), num(2), num(3)) {
                        path.push(SubPath::Rect([
                            state.ctm.apply(x, y),
                            state.ctm.apply(x + w, y),
                            state.ctm.apply(x + w, y + h),
                            state.ctm.apply(x, y + h),
                        ]));
                    }
                }
                "h" => {
                    if let Some(SubPath::Polyline { points, .. }) = path.last_mut() {
                        if let (Some(first), Some(last)) = (points.first().copied(), points.last())
                        {
                            if first != *last {
                                points.push(first);
                            }
                        }
                    }
                }
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                    for sub in path.drain(..) {
                        self.paint(sub);
                    }
                }
                "n" => path.clear(),

                "Do" if depth < MAX_FORM_DEPTH => {
                    if let Some(name) = args.first().and_then(|o| o.as_name().ok()) {
                        self.run_form(name, resources, &state, depth);
                    }
                }
                _ => {}
            }
        }

        self.fonts = saved_fonts;
    }

    fn run_form(
        &mut self,
        name: &[u8],
        resources: Option<&Dictionary>,
        state: &GraphicsState,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(Object::Stream(stream)) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|x| x.get(name).ok())
            .map(|o| resolve(doc, o))
        else {
            return;
        };
        if stream.dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok()) != Some(b"Form".as_slice()) {
            return;
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let Ok(content) = Content::decode(&data) else {
            trace!("Skipping undecodable form {}", String::from_utf8_lossy(name));
            return;
        };

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|a| Matrix::from_operands(a))
            .unwrap_or_else(Matrix::identity);
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .or(resources);

        self.run_at_depth(
            &content.operations,
            form_resources,
            matrix.multiply(&state.ctm),
            depth + 1,
        );
    }

    fn load_fonts(&mut self, resources: Option<&Dictionary>) {
        let doc = self.doc;
        let Some(fonts) = resources
            .and_then(|r| r.get(b"Font").ok())
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return;
        };

        for (name, font) in fonts.iter() {
            if let Ok(font) = resolve(doc, font).as_dict() {
                self.fonts.insert(name.clone(), FontInfo::load(doc, font));
            }
        }
    }

    fn show(&mut self, bytes: &[u8], state: &GraphicsState, tm: &mut Matrix) {
        let default_font = FontInfo::default();
        let font = state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&default_font);

        let size = state.font_size;
        let params = Matrix::new(size * state.h_scale, 0.0, 0.0, size, 0.0, state.rise);

        for glyph in font.decode(bytes) {
            let trm = params.multiply(tm).multiply(&state.ctm);
            let advance = glyph.width / 1000.0;

            let (x0, y0) = trm.apply(0.0, 0.0);
            let (x1, _) = trm.apply(advance, 0.0);
            let (_, y1) = trm.apply(0.0, 1.0);
            let (low, high) = (y0.min(y1), y0.max(y1));

            self.objects.glyphs.push(Glyph {
                text: glyph.text,
                x0: x0.min(x1),
                x1: x0.max(x1),
                top: self.page_height - high,
                bottom: self.page_height - low,
            });

            let mut tx = glyph.width / 1000.0 * size + state.char_spacing;
            if glyph.is_space_code {
                tx += state.word_spacing;
            }
            *tm = Matrix::translation(tx * state.h_scale, 0.0).multiply(tm);
        }
    }

    fn paint(&mut self, sub: SubPath) {
        match sub {
            SubPath::Polyline { points, curved: false } if points.len() == 2 => {
                let segment = self.bbox_segment(&points);
                self.objects.lines.push(segment);
            }
            SubPath::Polyline { points, curved: false } if is_rectangle(&points) => {
                let segment = self.bbox_segment(&points);
                self.objects.rects.push(segment);
            }
            SubPath::Rect(corners) => {
                let segment = self.bbox_segment(&corners);
                self.objects.rects.push(segment);
            }
            SubPath::Polyline { .. } => {}
        }
    }

    /// Bounding box in top-down coordinates, as a layer segment.
    fn bbox_segment(&self, points: &[(f64, f64)]) -> Segment {
        let x0 = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let x1 = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let y0 = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let y1 = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        let top = self.page_height - y1;
        let bottom = self.page_height - y0;
        Segment::from_layer(x0, top, bottom, x1 - x0, bottom - top)
    }
}

/// Four axis-aligned sides, closed or not.
fn is_rectangle(points: &[(f64, f64)]) -> bool {
    let corners = match points {
        [a, b, c, d, e] if a == e => [*a, *b, *c, *d],
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return false,
    };
    (0..4).all(|i| {
        let (p, q) = (corners[i], corners[(i + 1) % 4]);
        p.0 == q.0 || p.1 == q.1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 5.0);

        // scale first, then shift
        assert_eq!(scale.multiply(&shift).apply(1.0, 1.0), (12.0, 7.0));
        // shift first, then scale
        assert_eq!(shift.multiply(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_is_rectangle() {
        let closed = [(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0), (0.0, 0.0)];
        assert!(is_rectangle(&closed));
        assert!(is_rectangle(&closed[..4]));

        let skewed = [(0.0, 0.0), (10.0, 1.0), (10.0, 5.0), (0.0, 5.0)];
        assert!(!is_rectangle(&skewed));
        assert!(!is_rectangle(&closed[..3]));
    }
}
