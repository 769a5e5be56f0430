//! KDLパーサー
//!
//! DreamChaser の KDL 設定ファイルをパースします。
//! ノードごとのパース処理はモジュールに分離されています。

mod project;
mod vpc;

use project::{parse_organization, parse_stack};
use vpc::parse_vpc;

use crate::error::{PlanError, Result};
use crate::model::Project;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;
use tracing::warn;

/// KDLファイルをパースして Project を生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Project> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PlanError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// KDL文字列をパース
///
/// 同名の `vpc` / `stack` が後から現れた場合は後の定義で置き換える
/// （`dreamchaser.local.kdl` による上書き）。
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;

    let mut project = Project {
        name: default_name,
        ..Default::default()
    };

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(name) = first_string(node) {
                    project.name = name;
                }
            }
            "account" => project.account = first_string(node),
            "region" => project.region = first_string(node),
            "organization" => parse_organization(node, &mut project.organization)?,
            "vpc" => {
                let vpc = parse_vpc(node)?;
                match project.vpcs.iter_mut().find(|v| v.name == vpc.name) {
                    Some(existing) => *existing = vpc,
                    None => project.vpcs.push(vpc),
                }
            }
            "stack" => {
                let stack = parse_stack(node)?;
                match project.stacks.iter_mut().find(|s| s.name == stack.name) {
                    Some(existing) => *existing = stack,
                    None => project.stacks.push(stack),
                }
            }
            other => warn!(node = other, "Unknown top-level node ignored"),
        }
    }

    Ok(project)
}

/// ノード名の直後の文字列引数（`vpc "main"` の "main"）を必須で取得
fn node_label(node: &KdlNode) -> Result<String> {
    first_string(node).ok_or_else(|| {
        PlanError::InvalidConfig(format!("{} requires a name", node.name().value()))
    })
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn require_string(node: &KdlNode) -> Result<String> {
    first_string(node).ok_or_else(|| {
        PlanError::InvalidConfig(format!("{} requires a string value", node.name().value()))
    })
}

/// 名前なし引数の文字列をすべて取得（`zones "a" "b"`）
fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

/// 真偽値ノード。引数なしは true
fn flag(node: &KdlNode) -> Result<bool> {
    match node.entries().first() {
        None => Ok(true),
        Some(entry) => entry.value().as_bool().ok_or_else(|| {
            PlanError::InvalidConfig(format!(
                "{} expects #true or #false",
                node.name().value()
            ))
        }),
    }
}

fn integer<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| {
            PlanError::InvalidConfig(format!(
                "{} expects an integer in range",
                node.name().value()
            ))
        })
}

fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn prop_integer<T: TryFrom<i128>>(node: &KdlNode, key: &str) -> Result<Option<T>> {
    let Some(entry) = node
        .entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
    else {
        return Ok(None);
    };
    entry
        .value()
        .as_integer()
        .and_then(|v| T::try_from(v).ok())
        .map(Some)
        .ok_or_else(|| {
            PlanError::InvalidConfig(format!(
                "{}: {} expects an integer in range",
                node.name().value(),
                key
            ))
        })
}

#[cfg(test)]
mod tests;
