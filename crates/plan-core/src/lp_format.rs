//! CPLEX LP 格式匯出
//!
//! 僅供診斷與交給外部求解器比對使用，不提供匯入。

use std::fmt::Write;

use crate::expression::LinearExpression;
use crate::model::{Model, ObjectiveSense};
use crate::variable::{Variable, VariableKind};

impl Model {
    /// 輸出為 CPLEX LP 格式文字
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();

        // writeln! 寫入 String 不會失敗
        let _ = writeln!(out, "\\ Model: {}", self.name());
        if self.objective().constant() != 0.0 {
            let _ = writeln!(out, "\\ Objective constant: {}", self.objective().constant());
        }

        out.push_str(match self.sense() {
            ObjectiveSense::Minimize => "Minimize\n",
            ObjectiveSense::Maximize => "Maximize\n",
        });
        let _ = writeln!(out, " obj: {}", self.format_terms(self.objective()));

        out.push_str("Subject To\n");
        for c in self.constraints() {
            let _ = writeln!(
                out,
                " {}: {} {} {}",
                sanitize(&c.label),
                self.format_terms(&c.expression),
                c.op,
                c.normalized_rhs()
            );
        }

        let bounds: Vec<String> = self.variables().iter().filter_map(format_bound).collect();
        if !bounds.is_empty() {
            out.push_str("Bounds\n");
            for line in bounds {
                let _ = writeln!(out, " {line}");
            }
        }

        self.write_section(&mut out, "Generals", VariableKind::Integer);
        self.write_section(&mut out, "Binaries", VariableKind::Binary);

        out.push_str("End\n");
        out
    }

    fn format_terms(&self, expression: &LinearExpression) -> String {
        if expression.is_constant() {
            return "0".to_string();
        }

        expression
            .terms()
            .iter()
            .map(|(v, coef)| {
                let name = self
                    .variable(*v)
                    .map(|var| sanitize(&var.name))
                    .unwrap_or_else(|| format!("v{}", v.index()));
                format!("{coef:+} {name}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn write_section(&self, out: &mut String, title: &str, kind: VariableKind) {
        let names: Vec<String> = self
            .variables()
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| sanitize(&v.name))
            .collect();

        if !names.is_empty() {
            out.push_str(title);
            out.push('\n');
            for name in names {
                let _ = writeln!(out, " {name}");
            }
        }
    }
}

/// 非預設上下界的 Bounds 行（預設為 [0, +inf)，二元變數為 [0, 1]）
fn format_bound(variable: &Variable) -> Option<String> {
    let name = sanitize(&variable.name);
    let (lower, upper) = (variable.lower_bound, variable.upper_bound);

    let is_default = match variable.kind {
        VariableKind::Binary => lower == 0.0 && upper == 1.0,
        _ => lower == 0.0 && upper == f64::INFINITY,
    };
    if is_default {
        return None;
    }

    let line = if lower == upper {
        format!("{name} = {lower}")
    } else if lower == f64::NEG_INFINITY && upper == f64::INFINITY {
        format!("{name} free")
    } else {
        format!("{} <= {name} <= {}", format_limit(lower), format_limit(upper))
    };
    Some(line)
}

fn format_limit(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

fn sanitize(name: &str) -> String {
    name.replace(&[' ', '-', '+', '[', ']', '/', '>', '<', '=', ':'][..], "_")
}
