//! Padding, border and size of one resolved view.

use serde::Serialize;

use crate::schema::{BorderSetting, LayoutConfig};
use crate::units::Distance;

/// Inner spacing on all four sides, fully defaulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Padding {
    pub left: Distance,
    pub right: Distance,
    pub top: Distance,
    pub bottom: Distance,
}

impl Padding {
    pub fn uniform(value: Distance) -> Self {
        Self {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }

    pub fn horizontal(&self) -> Distance {
        Distance::from_mm(self.left.mm() + self.right.mm())
    }

    pub fn vertical(&self) -> Distance {
        Distance::from_mm(self.top.mm() + self.bottom.mm())
    }
}

/// Side-specific beats axis-specific beats uniform; anything unset is zero.
pub fn resolve_padding(cfg: &LayoutConfig) -> Padding {
    let side = |specific: Option<Distance>, axis: Option<Distance>| {
        specific
            .or(axis)
            .or(cfg.padding)
            .unwrap_or(Distance::ZERO)
    };
    Padding {
        left: side(cfg.padding_left, cfg.padding_x),
        right: side(cfg.padding_right, cfg.padding_x),
        top: side(cfg.padding_top, cfg.padding_y),
        bottom: side(cfg.padding_bottom, cfg.padding_y),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoxModel {
    pub padding: Padding,
    pub border: BorderSetting,
    pub cell_border: BorderSetting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Distance>,
}

impl BoxModel {
    pub fn resolve(effective: &LayoutConfig, border: &BorderSetting, cell_border: &BorderSetting) -> Self {
        Self {
            padding: resolve_padding(effective),
            border: border.clone(),
            cell_border: cell_border.clone(),
            width: effective.width,
            height: effective.height,
        }
    }
}
