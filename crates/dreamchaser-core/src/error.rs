use std::path::PathBuf;
use thiserror::Error;

/// 計画組み立て時の設定エラー
///
/// すべて同期的に検出され、エグゼキューターへ何も送信しないうちに返される。
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なCIDR: {cidr} ({reason})")]
    InvalidCidr { cidr: String, reason: String },

    #[error("マスク /{0} は 0〜32 の範囲外です")]
    MaskOutOfRange(u8),

    #[error("第3オクテットが溢れます: オフセット {offset} + ゾーン {zone_index} > 255")]
    OctetOverflow { offset: u16, zone_index: u8 },

    #[error("{cidr} はマスク /{mask} のネットワークアドレスではありません")]
    MisalignedSubnet { cidr: String, mask: u8 },

    #[error("サブネット {subnet} は VPC {vpc} の範囲外です")]
    OutsideVpc { subnet: String, vpc: String },

    #[error("サブネットが重複しています: {first} と {second}")]
    OverlappingSubnets { first: String, second: String },

    #[error("アベイラビリティゾーンが指定されていません")]
    NoZones,

    #[error("アベイラビリティゾーンが多すぎます: {0}個 (最大256)")]
    TooManyZones(usize),

    #[error("アベイラビリティゾーンが重複しています: {0}")]
    DuplicateZone(String),

    #[error("アベイラビリティゾーンが見つかりません: {0}")]
    UnknownZone(String),

    #[error("サブネット階層が重複しています: {0}")]
    DuplicateTier(String),

    #[error("未知のサブネット階層: {0}")]
    UnknownTier(String),

    #[error("パブリックサブネットにはインターネットゲートウェイ (internet #true) が必要です")]
    PublicWithoutInternet,

    #[error("インターネットゲートウェイを有効にしましたが、パブリックサブネットがありません")]
    InternetWithoutPublic,

    #[error("NATゲートウェイにはパブリックサブネットが必要です")]
    NatWithoutPublic,

    #[error("VPCエンドポイントを関連付けるルートテーブルがありません")]
    EndpointWithoutRouteTables,

    #[error("Transit Gateway のアタッチには transit 階層のサブネットが必要です")]
    MissingTransitTier,

    #[error("transit 階層がありますが Transit Gateway が指定されていません")]
    TransitTierWithoutGateway,

    #[error("ルート '{0}' には Transit Gateway が必要です")]
    RouteWithoutGateway(String),

    #[error("ルート '{0}' の宛先CIDRが指定されていません")]
    MissingDestination(String),

    #[error("ルート '{route}' の対象階層 {tier} は要求されていません")]
    RouteTierNotRequested { route: String, tier: String },

    #[error("ルートドメイン '{strategy}' ではサポートされない構成です: {reason}")]
    RouteDomain {
        strategy: &'static str,
        reason: String,
    },

    #[error("リソース共有の対象が未解決です (パラメータ: {0})")]
    UnresolvedShareTarget(String),

    #[error("既存の Transit Gateway は共有できません: {0}")]
    ShareExistingGateway(String),

    #[error("VPCが見つかりません: {0}")]
    VpcNotFound(String),

    #[error("スタックが見つかりません: {0}")]
    StackNotFound(String),

    #[error("JSON エラー: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
