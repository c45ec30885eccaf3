//! Binary frame codec.
//!
//! Every frame is a 1-byte type followed by an opaque body; all multi-byte
//! integers are big-endian. Positions travel as two `i16`s for anchors and
//! two `f32`s for moving entities.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::core::position::{TilePos, WorldPos};
use crate::game::leaderboard::PackedScore;

/// Frame type bytes, shared by both directions.
pub mod frame {
    pub const JOIN: u8 = 0;
    pub const CLIENT_PLACE_BUILDING: u8 = 1;
    pub const CLIENT_UPGRADE_BUILDINGS: u8 = 2;
    pub const CLIENT_DESTROY_BUILDINGS: u8 = 3;
    pub const CLIENT_MOVE_UNITS: u8 = 4;
    pub const PLAYER_JOINED: u8 = 5;
    pub const PLAYER_LEFT: u8 = 6;
    pub const BASE_HEALTH_UPDATE: u8 = 7;
    pub const BUILDING_PLACED: u8 = 8;
    pub const BUILDINGS_DESTROYED: u8 = 9;
    pub const BUILDINGS_UPGRADED: u8 = 10;
    pub const GAME_STATE: u8 = 11;
    pub const INITIAL_PLAYER_DATA: u8 = 12;
    pub const RESOURCE_UPDATE: u8 = 13;
    pub const SPAWN_UNIT: u8 = 14;
    pub const UNIT_POSITION_UPDATES: u8 = 15;
    pub const REMOVE_UNIT: u8 = 16;
    pub const KILLED: u8 = 17;
    pub const SPAWN_BULLET: u8 = 18;
    pub const BULLET_POSITION_UPDATE: u8 = 19;
    pub const REMOVE_BULLET: u8 = 20;
    pub const LEADERBOARD_UPDATE: u8 = 21;
    pub const REMOVE_SPAWN_PROTECTION: u8 = 22;
    pub const KICK_NOTIFICATION: u8 = 23;
    pub const CLIENT_CHAT_MESSAGE: u8 = 24;
    pub const CHAT_MESSAGE: u8 = 25;
    pub const UNIT_SPAWN_BULLET: u8 = 28;
    pub const BUILDING_PLACEMENT_FAILED: u8 = 29;
    pub const UNITS_ROTATION_UPDATE: u8 = 30;
    pub const CLIENT_CAMERA_UPDATE: u8 = 31;
    pub const INITIAL_BULLET_STATES: u8 = 32;
    pub const CLIENT_REQUEST_RESYNC: u8 = 33;
    pub const TURRET_ROTATION_UPDATE: u8 = 34;
    pub const NEUTRAL_BASE_CAPTURED: u8 = 35;
    pub const CLIENT_TOGGLE_UNIT_SPAWNING: u8 = 36;
    pub const BARRACK_ACTIVATION_UPDATE: u8 = 37;
    pub const CLIENT_BUY_REPAIR: u8 = 38;
    pub const CLIENT_BUY_COMMANDER: u8 = 39;
    pub const CLIENT_REQUEST_SKIN_DATA: u8 = 40;
    pub const SKIN_DATA: u8 = 41;
    pub const HEARTBEAT: u8 = 69;
    pub const SERVER_VERSION: u8 = 98;
    pub const REBOOT_ALERT: u8 = 99;
    pub const ERROR: u8 = 100;
}

pub const MAX_NAME_LEN: usize = 12;
pub const MAX_CHAT_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("payload too short: needed {needed} more byte(s)")]
    Truncated { needed: usize },
    #[error("invalid payload length {len} for frame {frame}")]
    BadLength { frame: u8, len: usize },
    #[error("invalid field value")]
    BadValue,
}

// =============================================================================
// WRITER
// =============================================================================

/// Builds an outbound frame; the type byte goes in first.
pub struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    pub fn new(frame_type: u8) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u8(frame_type);
        Self { buf }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32(v);
        self
    }

    pub fn put_slice(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    /// Anchor position: two big-endian `i16`s.
    pub fn put_tile_pos(&mut self, pos: TilePos) -> &mut Self {
        self.buf.put_i16(pos.x);
        self.buf.put_i16(pos.y);
        self
    }

    /// Entity position: two big-endian `f32`s.
    pub fn put_world_pos(&mut self, pos: WorldPos) -> &mut Self {
        self.buf.put_f32(pos.x);
        self.buf.put_f32(pos.y);
        self
    }

    /// Fixed 12-byte name, zero-padded.
    pub fn put_name(&mut self, name: &[u8]) -> &mut Self {
        let mut fixed = [0u8; MAX_NAME_LEN];
        let len = name.len().min(MAX_NAME_LEN);
        fixed[..len].copy_from_slice(&name[..len]);
        self.buf.put_slice(&fixed);
        self
    }

    /// Packed leaderboard score: the unit byte, then 2 bytes. Above a
    /// million: 9-bit integer (clamped to 511) and 7-bit fraction (clamped
    /// to 99). Above a thousand: 10-bit integer (1023) and 6-bit fraction
    /// (63). Below: the raw value as `u16`.
    pub fn put_packed_score(&mut self, score: &PackedScore) -> &mut Self {
        self.buf.put_u8(score.unit);
        let packed = if score.full >= 1_000_000 {
            (score.integer.min(0x1ff) << 7) | u16::from(score.fraction.min(99))
        } else if score.full >= 1_000 {
            (score.integer.min(0x3ff) << 6) | u16::from(score.fraction.min(0x3f))
        } else {
            score.full as u16
        };
        self.buf.put_u16(packed);
        self
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

// =============================================================================
// READER
// =============================================================================

/// Cursor over an inbound payload (the type byte already stripped).
pub struct FrameReader<'a> {
    buf: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < n {
            Err(ProtocolError::Truncated {
                needed: n - self.buf.len(),
            })
        } else {
            Ok(())
        }
    }

    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_f32(&mut self) -> Result<f32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn get_tile_pos(&mut self) -> Result<TilePos, ProtocolError> {
        self.need(4)?;
        let x = self.buf.get_i16();
        let y = self.buf.get_i16();
        Ok(TilePos::new(x, y))
    }

    pub fn get_world_pos(&mut self) -> Result<WorldPos, ProtocolError> {
        self.need(8)?;
        let x = self.buf.get_f32();
        let y = self.buf.get_f32();
        Ok(WorldPos::new(x, y))
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }
}

// =============================================================================
// INTENT PAYLOADS
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
pub struct JoinIntent {
    pub name: Vec<u8>,
    pub equipped_skin: u8,
    pub fingerprint: u32,
}

/// `name (≤12B) || skin (1) || fingerprint (4 BE)`.
pub fn parse_join(payload: &[u8]) -> Result<JoinIntent, ProtocolError> {
    if payload.len() < 5 || payload.len() > MAX_NAME_LEN + 5 {
        return Err(ProtocolError::BadLength {
            frame: frame::JOIN,
            len: payload.len(),
        });
    }
    let name_len = payload.len() - 5;
    let mut fingerprint_bytes = [0u8; 4];
    fingerprint_bytes.copy_from_slice(&payload[payload.len() - 4..]);
    Ok(JoinIntent {
        name: payload[..name_len].to_vec(),
        equipped_skin: payload[name_len],
        fingerprint: u32::from_be_bytes(fingerprint_bytes),
    })
}

#[derive(Debug, PartialEq)]
pub struct PlaceBuildingIntent {
    pub kind: u8,
    pub position: WorldPos,
}

/// `type (1) || position (2 f32 BE)`.
pub fn parse_place_building(payload: &[u8]) -> Result<PlaceBuildingIntent, ProtocolError> {
    if payload.len() != 9 {
        return Err(ProtocolError::BadLength {
            frame: frame::CLIENT_PLACE_BUILDING,
            len: payload.len(),
        });
    }
    let mut reader = FrameReader::new(payload);
    Ok(PlaceBuildingIntent {
        kind: reader.get_u8()?,
        position: reader.get_world_pos()?,
    })
}

#[derive(Debug, PartialEq, Eq)]
pub struct UpgradeIntent {
    pub neutral_base: Option<u8>,
    pub variant: u8,
    pub building_ids: Vec<u8>,
}

/// `flag (1) || [neutralBaseId (1)] || variant (1) || ids…`.
pub fn parse_upgrade(payload: &[u8]) -> Result<UpgradeIntent, ProtocolError> {
    let mut reader = FrameReader::new(payload);
    let flag = reader.get_u8()?;
    let neutral_base = if flag == 1 { Some(reader.get_u8()?) } else { None };
    let variant = reader.get_u8()?;
    let building_ids = reader.rest().to_vec();
    if building_ids.is_empty() {
        return Err(ProtocolError::BadLength {
            frame: frame::CLIENT_UPGRADE_BUILDINGS,
            len: payload.len(),
        });
    }
    Ok(UpgradeIntent {
        neutral_base,
        variant,
        building_ids,
    })
}

#[derive(Debug, PartialEq, Eq)]
pub struct DestroyIntent {
    pub neutral_base: Option<u8>,
    pub building_ids: Vec<u8>,
}

/// `flag (1) || [neutralBaseId (1)] || ids…`.
pub fn parse_destroy(payload: &[u8]) -> Result<DestroyIntent, ProtocolError> {
    let mut reader = FrameReader::new(payload);
    let flag = reader.get_u8()?;
    let neutral_base = if flag == 1 { Some(reader.get_u8()?) } else { None };
    let building_ids = reader.rest().to_vec();
    if building_ids.is_empty() {
        return Err(ProtocolError::BadLength {
            frame: frame::CLIENT_DESTROY_BUILDINGS,
            len: payload.len(),
        });
    }
    Ok(DestroyIntent {
        neutral_base,
        building_ids,
    })
}

#[derive(Debug, PartialEq, Eq)]
pub struct MoveUnitsIntent {
    pub target: TilePos,
    pub unit_ids: Vec<u8>,
}

/// `count (1) || target (4 BE int16) || ids…`; the declared count must match
/// the trailing ID list.
pub fn parse_move_units(payload: &[u8]) -> Result<MoveUnitsIntent, ProtocolError> {
    let mut reader = FrameReader::new(payload);
    let count = reader.get_u8()? as usize;
    let target = reader.get_tile_pos()?;
    let unit_ids = reader.rest().to_vec();
    if count == 0 || unit_ids.len() != count {
        return Err(ProtocolError::BadLength {
            frame: frame::CLIENT_MOVE_UNITS,
            len: payload.len(),
        });
    }
    Ok(MoveUnitsIntent { target, unit_ids })
}

#[derive(Debug, PartialEq, Eq)]
pub struct ToggleSpawningIntent {
    pub building_id: u8,
    pub neutral_base: Option<u8>,
}

/// `buildingId (1) || [neutralBaseId (1)]`.
pub fn parse_toggle_spawning(payload: &[u8]) -> Result<ToggleSpawningIntent, ProtocolError> {
    match payload.len() {
        1 => Ok(ToggleSpawningIntent {
            building_id: payload[0],
            neutral_base: None,
        }),
        2 => Ok(ToggleSpawningIntent {
            building_id: payload[0],
            neutral_base: Some(payload[1]),
        }),
        len => Err(ProtocolError::BadLength {
            frame: frame::CLIENT_TOGGLE_UNIT_SPAWNING,
            len,
        }),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CameraIntent {
    pub position: TilePos,
    /// Zoom level scaled by 10 on the wire.
    pub zoom_tenths: u8,
}

/// `position (4 BE int16) || zoom (1)`.
pub fn parse_camera_update(payload: &[u8]) -> Result<CameraIntent, ProtocolError> {
    if payload.len() < 5 {
        return Err(ProtocolError::BadLength {
            frame: frame::CLIENT_CAMERA_UPDATE,
            len: payload.len(),
        });
    }
    let mut reader = FrameReader::new(payload);
    Ok(CameraIntent {
        position: reader.get_tile_pos()?,
        zoom_tenths: reader.get_u8()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::leaderboard::pack_score;

    #[test]
    fn join_payload_round_trip() {
        let mut payload = b"Rusty".to_vec();
        payload.push(7); // equipped skin
        payload.extend_from_slice(&0xdead_beef_u32.to_be_bytes());
        let intent = parse_join(&payload).unwrap();
        assert_eq!(intent.name, b"Rusty");
        assert_eq!(intent.equipped_skin, 7);
        assert_eq!(intent.fingerprint, 0xdead_beef);
    }

    #[test]
    fn join_rejects_bad_lengths() {
        assert!(parse_join(&[0; 4]).is_err());
        assert!(parse_join(&[0; 18]).is_err());
        // Empty name is allowed; 5 bytes is the minimum.
        assert!(parse_join(&[1, 0, 0, 0, 0]).is_ok());
    }

    #[test]
    fn place_building_payload() {
        let mut payload = vec![4u8];
        payload.extend_from_slice(&350.0_f32.to_be_bytes());
        payload.extend_from_slice(&(-20.5_f32).to_be_bytes());
        let intent = parse_place_building(&payload).unwrap();
        assert_eq!(intent.kind, 4);
        assert_eq!(intent.position, WorldPos::new(350.0, -20.5));
        assert!(parse_place_building(&payload[..8]).is_err());
    }

    #[test]
    fn upgrade_payload_with_and_without_neutral() {
        let intent = parse_upgrade(&[0, 1, 5, 6]).unwrap();
        assert_eq!(intent.neutral_base, None);
        assert_eq!(intent.variant, 1);
        assert_eq!(intent.building_ids, vec![5, 6]);

        let intent = parse_upgrade(&[1, 3, 2, 9]).unwrap();
        assert_eq!(intent.neutral_base, Some(3));
        assert_eq!(intent.variant, 2);
        assert_eq!(intent.building_ids, vec![9]);

        // No IDs at all is malformed.
        assert!(parse_upgrade(&[0, 1]).is_err());
    }

    #[test]
    fn move_units_payload() {
        let mut payload = vec![2u8];
        payload.extend_from_slice(&100i16.to_be_bytes());
        payload.extend_from_slice(&(-50i16).to_be_bytes());
        payload.extend_from_slice(&[3, 4]);
        let intent = parse_move_units(&payload).unwrap();
        assert_eq!(intent.target, TilePos::new(100, -50));
        assert_eq!(intent.unit_ids, vec![3, 4]);

        // Declared count mismatching the list is malformed.
        payload[0] = 3;
        assert!(parse_move_units(&payload).is_err());
    }

    #[test]
    fn score_packing_tiers() {
        // Below a thousand the raw value travels.
        let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
        w.put_packed_score(&pack_score(950));
        let bytes = w.finish();
        assert_eq!(bytes[1], 0);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 950);

        // 12.3k: 12 << 6 | 3.
        let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
        w.put_packed_score(&pack_score(12_345));
        let bytes = w.finish();
        assert_eq!(bytes[1], b'k');
        let packed = u16::from_be_bytes([bytes[2], bytes[3]]);
        assert_eq!(packed >> 6, 12);
        assert_eq!(packed & 0x3f, 3);

        // 2.34M: 2 << 7 | 34.
        let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
        w.put_packed_score(&pack_score(2_340_000));
        let bytes = w.finish();
        assert_eq!(bytes[1], b'M');
        let packed = u16::from_be_bytes([bytes[2], bytes[3]]);
        assert_eq!(packed >> 7, 2);
        assert_eq!(packed & 0x7f, 34);
    }

    #[test]
    fn score_packing_clamps() {
        // 1023k cap on the integer part.
        let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
        let mut score = pack_score(999_999);
        score.integer = 2000;
        w.put_packed_score(&score);
        let bytes = w.finish();
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) >> 6, 1023);

        // 511M cap.
        let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
        let score = pack_score(600_000_000);
        assert_eq!(score.integer, 600);
        w.put_packed_score(&score);
        let bytes = w.finish();
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) >> 7, 511);
    }

    #[test]
    fn name_field_is_padded_to_twelve() {
        let mut w = FrameWriter::new(frame::PLAYER_JOINED);
        w.put_name(b"abc");
        let bytes = w.finish();
        assert_eq!(bytes.len(), 1 + 12);
        assert_eq!(&bytes[1..4], b"abc");
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn reader_reports_truncation() {
        let mut reader = FrameReader::new(&[1, 2]);
        assert_eq!(reader.get_u8(), Ok(1));
        assert!(matches!(reader.get_u32(), Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn world_pos_round_trips() {
        let mut w = FrameWriter::new(0);
        w.put_world_pos(WorldPos::new(123.5, -77.25));
        let bytes = w.finish();
        let mut reader = FrameReader::new(&bytes[1..]);
        assert_eq!(reader.get_world_pos().unwrap(), WorldPos::new(123.5, -77.25));
    }
}
