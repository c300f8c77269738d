//! 決策變數模型

use serde::{Deserialize, Serialize};

/// 變數句柄（即模型中的欄位索引）
///
/// 句柄只對發出它的 [`Model`](crate::Model) 有效。句柄不帶模型身分，拿到另一個
/// 模型時只檢查索引範圍：範圍外回傳 `UnknownVariable`，範圍內會對應到該模型同一
/// 欄位的變數。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    /// 欄位索引（加入順序）
    pub fn index(self) -> usize {
        self.0
    }
}

/// 變數類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// 連續變數
    Continuous,
    /// 二元變數（0 或 1）
    Binary,
    /// 一般整數變數
    Integer,
}

impl VariableKind {
    /// 是否需要整數解（分支定界會對其分支）
    pub fn is_integral(self) -> bool {
        matches!(self, VariableKind::Binary | VariableKind::Integer)
    }
}

/// 決策變數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// 變數句柄
    pub id: VariableId,

    /// 變數名稱（模型內唯一）
    pub name: String,

    /// 變數類型
    pub kind: VariableKind,

    /// 下界（可為 -∞）
    #[serde(with = "lower_bound_serde")]
    pub lower_bound: f64,

    /// 上界（可為 +∞）
    #[serde(with = "upper_bound_serde")]
    pub upper_bound: f64,
}

impl Variable {
    /// 是否為整數類變數
    pub fn is_integral(&self) -> bool {
        self.kind.is_integral()
    }

    /// 是否上下界都有限
    pub fn is_bounded(&self) -> bool {
        self.lower_bound.is_finite() && self.upper_bound.is_finite()
    }

    /// 是否已被固定（上下界相等）
    pub fn is_fixed(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

// JSON 無法表示無窮大，以 null 代表無界
mod lower_bound_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod upper_bound_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
