use crate::logic::board::PieceKind;
use crate::logic::eval_constants::{
    PST_SCALE, VAL_BISHOP, VAL_KING, VAL_KNIGHT, VAL_PAWN, VAL_QUEEN, VAL_ROOK,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Search Parameters
    pub max_depth: u8,
    pub shortcut_move_count: usize, // Root searches with this many moves or fewer are skipped
    pub ordering_plies: u8,         // Plies below the root that get a full sort
    pub eval_cache_capacity: usize,
    pub attack_cache_capacity: usize,
    pub opening_piece_threshold: usize,

    // Material (pawns)
    pub val_pawn: f64,
    pub val_knight: f64,
    pub val_bishop: f64,
    pub val_rook: f64,
    pub val_queen: f64,
    pub val_king: f64,
    pub pst_scale: f64,

    // Positional terms
    pub bishop_pair: f64,
    pub rook_half_open_file: f64,
    pub rook_open_file: f64,
    pub development: f64,
    pub center_pawn: f64,
    pub early_queen: [f64; 4], // Indexed by developed minors, capped at 3
    pub early_queen_uncastled: f64,
    pub castled: f64,
    pub castled_developed: f64,
    pub castle_ready: f64,
    pub mobility: f64,
    pub king_zone_attack: f64,
    pub pawn_shield: f64,
    pub in_check: f64,
    pub doubled_pawn: f64,
    pub isolated_pawn: f64,
    pub passed_pawn: f64,
    pub passed_pawn_per_rank: f64,
    pub capture_threat: f64,
    pub hanging_piece: f64,

    // Move ordering
    pub score_capture_base: i32,
    pub score_capture_victim: i32,
    pub score_promotion: i32,
    pub score_check: i32,
    pub score_knight_development: i32,
    pub score_bishop_development: i32,
    pub score_castle: i32,
    pub score_center: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            shortcut_move_count: 3,
            ordering_plies: 2,
            eval_cache_capacity: 1000,
            attack_cache_capacity: 4096,
            opening_piece_threshold: 28,

            val_pawn: VAL_PAWN,
            val_knight: VAL_KNIGHT,
            val_bishop: VAL_BISHOP,
            val_rook: VAL_ROOK,
            val_queen: VAL_QUEEN,
            val_king: VAL_KING,
            pst_scale: PST_SCALE,

            bishop_pair: 0.5,
            rook_half_open_file: 0.25,
            rook_open_file: 0.35,
            development: 0.5,
            center_pawn: 0.3,
            early_queen: [2.5, 2.0, 1.5, 1.0],
            early_queen_uncastled: 0.8,
            castled: 1.5,
            castled_developed: 0.6,
            castle_ready: 0.5,
            mobility: 0.08,
            king_zone_attack: 0.25,
            pawn_shield: 0.15,
            in_check: 0.6,
            doubled_pawn: 0.2,
            isolated_pawn: 0.3,
            passed_pawn: 0.25,
            passed_pawn_per_rank: 0.03,
            capture_threat: 0.25,
            hanging_piece: 0.15,

            score_capture_base: 1000,
            score_capture_victim: 10,
            score_promotion: 900,
            score_check: 800,
            score_knight_development: 200,
            score_bishop_development: 150,
            score_castle: 1000,
            score_center: 50,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn piece_value(&self, kind: PieceKind) -> f64 {
        match kind {
            PieceKind::Pawn => self.val_pawn,
            PieceKind::Knight => self.val_knight,
            PieceKind::Bishop => self.val_bishop,
            PieceKind::Rook => self.val_rook,
            PieceKind::Queen => self.val_queen,
            PieceKind::King => self.val_king,
        }
    }

    /// Whole-pawn value used by move ordering.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn piece_value_int(&self, kind: PieceKind) -> i32 {
        self.piece_value(kind).round() as i32
    }
}

/// Multipliers over the default weights. Structural settings are absolute.
#[derive(Deserialize)]
struct EngineConfigJson {
    max_depth: Option<u8>,
    shortcut_move_count: Option<usize>,
    ordering_plies: Option<u8>,
    eval_cache_capacity: Option<usize>,
    attack_cache_capacity: Option<usize>,

    val_pawn: Option<f64>,
    val_knight: Option<f64>,
    val_bishop: Option<f64>,
    val_rook: Option<f64>,
    val_queen: Option<f64>,
    pst_scale: Option<f64>,

    bishop_pair: Option<f64>,
    rook_files: Option<f64>,
    opening: Option<f64>,
    mobility: Option<f64>,
    king_safety: Option<f64>,
    in_check: Option<f64>,
    pawn_structure: Option<f64>,
    tactics: Option<f64>,

    score_capture_base: Option<f64>,
    score_promotion: Option<f64>,
    score_check: Option<f64>,
    score_development: Option<f64>,
    score_castle: Option<f64>,
    score_center: Option<f64>,
}

impl EngineConfig {
    /// Builds a config from a JSON object of optional multipliers over the defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the input is not such an object.
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        let json: EngineConfigJson = serde_json::from_str(json_str)?;
        let d = Self::default();

        let opening = json.opening;
        let king_safety = json.king_safety;
        let pawns = json.pawn_structure;
        let tactics = json.tactics;
        let development = json.score_development;

        Ok(Self {
            max_depth: json.max_depth.unwrap_or(d.max_depth),
            shortcut_move_count: json.shortcut_move_count.unwrap_or(d.shortcut_move_count),
            ordering_plies: json.ordering_plies.unwrap_or(d.ordering_plies),
            eval_cache_capacity: json.eval_cache_capacity.unwrap_or(d.eval_cache_capacity),
            attack_cache_capacity: json
                .attack_cache_capacity
                .unwrap_or(d.attack_cache_capacity),
            opening_piece_threshold: d.opening_piece_threshold,

            val_pawn: apply_scale(d.val_pawn, json.val_pawn),
            val_knight: apply_scale(d.val_knight, json.val_knight),
            val_bishop: apply_scale(d.val_bishop, json.val_bishop),
            val_rook: apply_scale(d.val_rook, json.val_rook),
            val_queen: apply_scale(d.val_queen, json.val_queen),
            val_king: d.val_king,
            pst_scale: apply_scale(d.pst_scale, json.pst_scale),

            bishop_pair: apply_scale(d.bishop_pair, json.bishop_pair),
            rook_half_open_file: apply_scale(d.rook_half_open_file, json.rook_files),
            rook_open_file: apply_scale(d.rook_open_file, json.rook_files),
            development: apply_scale(d.development, opening),
            center_pawn: apply_scale(d.center_pawn, opening),
            early_queen: d.early_queen.map(|p| apply_scale(p, opening)),
            early_queen_uncastled: apply_scale(d.early_queen_uncastled, opening),
            castled: apply_scale(d.castled, opening),
            castled_developed: apply_scale(d.castled_developed, opening),
            castle_ready: apply_scale(d.castle_ready, opening),
            mobility: apply_scale(d.mobility, json.mobility),
            king_zone_attack: apply_scale(d.king_zone_attack, king_safety),
            pawn_shield: apply_scale(d.pawn_shield, king_safety),
            in_check: apply_scale(d.in_check, json.in_check),
            doubled_pawn: apply_scale(d.doubled_pawn, pawns),
            isolated_pawn: apply_scale(d.isolated_pawn, pawns),
            passed_pawn: apply_scale(d.passed_pawn, pawns),
            passed_pawn_per_rank: apply_scale(d.passed_pawn_per_rank, pawns),
            capture_threat: apply_scale(d.capture_threat, tactics),
            hanging_piece: apply_scale(d.hanging_piece, tactics),

            score_capture_base: apply_scale_int(d.score_capture_base, json.score_capture_base),
            score_capture_victim: d.score_capture_victim,
            score_promotion: apply_scale_int(d.score_promotion, json.score_promotion),
            score_check: apply_scale_int(d.score_check, json.score_check),
            score_knight_development: apply_scale_int(d.score_knight_development, development),
            score_bishop_development: apply_scale_int(d.score_bishop_development, development),
            score_castle: apply_scale_int(d.score_castle, json.score_castle),
            score_center: apply_scale_int(d.score_center, json.score_center),
        })
    }
}

fn apply_scale(default_val: f64, scale: Option<f64>) -> f64 {
    scale.map_or(default_val, |s| default_val * s)
}

#[allow(clippy::cast_possible_truncation)]
fn apply_scale_int(default_val: i32, scale: Option<f64>) -> i32 {
    scale.map_or(default_val, |s| (f64::from(default_val) * s) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_default() {
        let config = EngineConfig::load_from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.eval_cache_capacity, 1000);
    }

    #[test]
    fn test_load_config_scaled() {
        let json = r#"{
            "val_queen": 0.5,
            "score_check": 0.5,
            "king_safety": 2.0
        }"#;
        let config = EngineConfig::load_from_json(json).unwrap();
        assert!((config.val_queen - 4.5).abs() < f64::EPSILON);
        assert_eq!(config.score_check, 400);
        assert!((config.king_zone_attack - 0.5).abs() < f64::EPSILON);
        assert!((config.pawn_shield - 0.3).abs() < 1e-12);
        // Untouched groups keep their defaults
        assert!((config.mobility - 0.08).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_config_structural_values_are_absolute() {
        let json = r#"{ "max_depth": 5, "eval_cache_capacity": 16 }"#;
        let config = EngineConfig::load_from_json(json).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.eval_cache_capacity, 16);
        assert_eq!(config.shortcut_move_count, 3);
    }

    #[test]
    fn test_load_config_invalid_json() {
        assert!(EngineConfig::load_from_json("{ invalid json }").is_err());
        assert!(EngineConfig::load_from_json(r#"{ "max_depth": -1 }"#).is_err());
    }

    #[test]
    fn test_load_config_opening_group() {
        let config = EngineConfig::load_from_json(r#"{ "opening": 0.0 }"#).unwrap();
        assert!(config.early_queen.iter().all(|p| *p == 0.0));
        assert!(config.castled == 0.0 && config.development == 0.0);
        assert!((config.bishop_pair - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_absolute_config() {
        let json = r#"{
            "val_queen": 10.0,
            "max_depth": 2
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!((config.val_queen - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.max_depth, 2);
        assert!((config.val_rook - VAL_ROOK).abs() < f64::EPSILON);
    }

    #[test]
    fn test_piece_values() {
        let config = EngineConfig::default();
        assert_eq!(config.piece_value_int(PieceKind::Queen), 9);
        assert_eq!(config.piece_value_int(PieceKind::King), 0);
        assert!((config.piece_value(PieceKind::Knight) - 3.0).abs() < f64::EPSILON);
    }
}
