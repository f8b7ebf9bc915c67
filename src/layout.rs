pub const COLUMN_COUNT: usize = 4;
pub const BOX_MARGIN_X: f32 = 10.0;
pub const BOX_MARGIN_TOP: f32 = 10.0;
pub const BOX_HEIGHT: f32 = 130.0;
pub const CORNER_RADIUS: f32 = 12.0;
/// Height reserved at the bottom of each box for the label.
pub const LABEL_AREA_HEIGHT: f32 = 38.0;
pub const LABEL_BOTTOM_PADDING: f32 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxBounds {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnGeometry {
    pub bounds: BoxBounds,
    pub center_x: f32,
    pub corner_radius: f32,
    /// Vertical span the numeral is centered in.
    pub numeral_top: f32,
    pub numeral_bottom: f32,
    /// Label ink sits on this line.
    pub label_baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardGeometry {
    pub width: u32,
    pub height: u32,
    pub columns: Vec<ColumnGeometry>,
}

impl ScoreboardGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            columns: layout(width, height, COLUMN_COUNT),
        }
    }
}

/// Splits the canvas into `column_count` equal bands, one box per band.
///
/// Box height and margins are constants; they do not follow font metrics,
/// so very large point sizes can overflow a box. A canvas shorter than
/// `BOX_MARGIN_TOP + BOX_HEIGHT` cuts the boxes off at its bottom edge.
pub fn layout(canvas_width: u32, canvas_height: u32, column_count: usize) -> Vec<ColumnGeometry> {
    if column_count == 0 {
        return Vec::new();
    }

    let band_width = canvas_width as f32 / column_count as f32;
    let box_width = (band_width - 2.0 * BOX_MARGIN_X).max(0.0);
    let box_height = BOX_HEIGHT.min((canvas_height as f32 - BOX_MARGIN_TOP).max(0.0));
    let corner_radius = CORNER_RADIUS.min(box_width * 0.5).min(box_height * 0.5);

    (0..column_count)
        .map(|index| {
            let band_x = band_width * index as f32;
            let bounds = BoxBounds {
                x: band_x + (band_width - box_width) * 0.5,
                y: BOX_MARGIN_TOP,
                width: box_width,
                height: box_height,
            };
            ColumnGeometry {
                bounds,
                center_x: band_x + band_width * 0.5,
                corner_radius,
                numeral_top: bounds.y,
                numeral_bottom: (bounds.bottom() - LABEL_AREA_HEIGHT).max(bounds.y),
                label_baseline: (bounds.bottom() - LABEL_BOTTOM_PADDING).max(bounds.y),
            }
        })
        .collect()
}
