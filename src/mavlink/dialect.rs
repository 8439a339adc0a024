//! Message metadata for the `common` MAVLink dialect.
//!
//! The routing engine needs three things per message: its name, and the
//! payload offsets of the `target_system`/`target_component` fields for
//! messages that carry a destination. Offsets follow the wire order of the
//! generated message-entry tables (fields sorted by size, extensions last).

use std::collections::HashMap;
use std::sync::OnceLock;

/// Metadata for a single message of the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: u32,
    pub name: &'static str,
    /// Payload offset of the `target_system` field, if the message has one.
    pub target_system: Option<u8>,
    /// Payload offset of the `target_component` field, if the message has one.
    pub target_component: Option<u8>,
}

/// Look up a message by numeric ID.
pub fn by_id(id: u32) -> Option<&'static MessageInfo> {
    MESSAGES
        .binary_search_by_key(&id, |info| info.id)
        .ok()
        .map(|index| &MESSAGES[index])
}

/// Look up a message by name.
pub fn by_name(name: &str) -> Option<&'static MessageInfo> {
    static INDEX: OnceLock<HashMap<&'static str, &'static MessageInfo>> = OnceLock::new();
    let index = INDEX.get_or_init(|| MESSAGES.iter().map(|info| (info.name, info)).collect());
    index.get(name).copied()
}

const fn broadcast(id: u32, name: &'static str) -> MessageInfo {
    MessageInfo {
        id,
        name,
        target_system: None,
        target_component: None,
    }
}

const fn targeted(id: u32, name: &'static str, system: u8, component: u8) -> MessageInfo {
    MessageInfo {
        id,
        name,
        target_system: Some(system),
        target_component: Some(component),
    }
}

const fn system_targeted(id: u32, name: &'static str, system: u8) -> MessageInfo {
    MessageInfo {
        id,
        name,
        target_system: Some(system),
        target_component: None,
    }
}

// Sorted by ID; `by_id` relies on it.
static MESSAGES: &[MessageInfo] = &[
    broadcast(0, "HEARTBEAT"),
    broadcast(1, "SYS_STATUS"),
    broadcast(2, "SYSTEM_TIME"),
    targeted(4, "PING", 12, 13),
    system_targeted(5, "CHANGE_OPERATOR_CONTROL", 0),
    broadcast(6, "CHANGE_OPERATOR_CONTROL_ACK"),
    broadcast(7, "AUTH_KEY"),
    system_targeted(11, "SET_MODE", 4),
    targeted(20, "PARAM_REQUEST_READ", 2, 3),
    targeted(21, "PARAM_REQUEST_LIST", 0, 1),
    broadcast(22, "PARAM_VALUE"),
    targeted(23, "PARAM_SET", 4, 5),
    broadcast(24, "GPS_RAW_INT"),
    broadcast(25, "GPS_STATUS"),
    broadcast(26, "SCALED_IMU"),
    broadcast(27, "RAW_IMU"),
    broadcast(28, "RAW_PRESSURE"),
    broadcast(29, "SCALED_PRESSURE"),
    broadcast(30, "ATTITUDE"),
    broadcast(31, "ATTITUDE_QUATERNION"),
    broadcast(32, "LOCAL_POSITION_NED"),
    broadcast(33, "GLOBAL_POSITION_INT"),
    broadcast(34, "RC_CHANNELS_SCALED"),
    broadcast(35, "RC_CHANNELS_RAW"),
    broadcast(36, "SERVO_OUTPUT_RAW"),
    targeted(37, "MISSION_REQUEST_PARTIAL_LIST", 4, 5),
    targeted(38, "MISSION_WRITE_PARTIAL_LIST", 4, 5),
    targeted(39, "MISSION_ITEM", 32, 33),
    targeted(40, "MISSION_REQUEST", 2, 3),
    targeted(41, "MISSION_SET_CURRENT", 2, 3),
    broadcast(42, "MISSION_CURRENT"),
    targeted(43, "MISSION_REQUEST_LIST", 0, 1),
    targeted(44, "MISSION_COUNT", 2, 3),
    targeted(45, "MISSION_CLEAR_ALL", 0, 1),
    broadcast(46, "MISSION_ITEM_REACHED"),
    targeted(47, "MISSION_ACK", 0, 1),
    system_targeted(48, "SET_GPS_GLOBAL_ORIGIN", 12),
    broadcast(49, "GPS_GLOBAL_ORIGIN"),
    targeted(50, "PARAM_MAP_RC", 18, 19),
    targeted(51, "MISSION_REQUEST_INT", 2, 3),
    targeted(54, "SAFETY_SET_ALLOWED_AREA", 24, 25),
    broadcast(55, "SAFETY_ALLOWED_AREA"),
    broadcast(61, "ATTITUDE_QUATERNION_COV"),
    broadcast(62, "NAV_CONTROLLER_OUTPUT"),
    broadcast(63, "GLOBAL_POSITION_INT_COV"),
    broadcast(64, "LOCAL_POSITION_NED_COV"),
    broadcast(65, "RC_CHANNELS"),
    targeted(66, "REQUEST_DATA_STREAM", 2, 3),
    broadcast(67, "DATA_STREAM"),
    system_targeted(69, "MANUAL_CONTROL", 10),
    targeted(70, "RC_CHANNELS_OVERRIDE", 16, 17),
    targeted(73, "MISSION_ITEM_INT", 32, 33),
    broadcast(74, "VFR_HUD"),
    targeted(75, "COMMAND_INT", 30, 31),
    targeted(76, "COMMAND_LONG", 30, 31),
    targeted(77, "COMMAND_ACK", 8, 9),
    targeted(80, "COMMAND_CANCEL", 2, 3),
    broadcast(81, "MANUAL_SETPOINT"),
    targeted(82, "SET_ATTITUDE_TARGET", 36, 37),
    broadcast(83, "ATTITUDE_TARGET"),
    targeted(84, "SET_POSITION_TARGET_LOCAL_NED", 50, 51),
    broadcast(85, "POSITION_TARGET_LOCAL_NED"),
    targeted(86, "SET_POSITION_TARGET_GLOBAL_INT", 50, 51),
    broadcast(87, "POSITION_TARGET_GLOBAL_INT"),
    broadcast(89, "LOCAL_POSITION_NED_SYSTEM_GLOBAL_OFFSET"),
    broadcast(90, "HIL_STATE"),
    broadcast(91, "HIL_CONTROLS"),
    broadcast(92, "HIL_RC_INPUTS_RAW"),
    broadcast(93, "HIL_ACTUATOR_CONTROLS"),
    broadcast(100, "OPTICAL_FLOW"),
    broadcast(101, "GLOBAL_VISION_POSITION_ESTIMATE"),
    broadcast(102, "VISION_POSITION_ESTIMATE"),
    broadcast(103, "VISION_SPEED_ESTIMATE"),
    broadcast(104, "VICON_POSITION_ESTIMATE"),
    broadcast(105, "HIGHRES_IMU"),
    broadcast(106, "OPTICAL_FLOW_RAD"),
    broadcast(107, "HIL_SENSOR"),
    broadcast(108, "SIM_STATE"),
    broadcast(109, "RADIO_STATUS"),
    targeted(110, "FILE_TRANSFER_PROTOCOL", 1, 2),
    targeted(111, "TIMESYNC", 16, 17),
    broadcast(112, "CAMERA_TRIGGER"),
    broadcast(113, "HIL_GPS"),
    broadcast(114, "HIL_OPTICAL_FLOW"),
    broadcast(115, "HIL_STATE_QUATERNION"),
    broadcast(116, "SCALED_IMU2"),
    targeted(117, "LOG_REQUEST_LIST", 4, 5),
    broadcast(118, "LOG_ENTRY"),
    targeted(119, "LOG_REQUEST_DATA", 10, 11),
    broadcast(120, "LOG_DATA"),
    targeted(121, "LOG_ERASE", 0, 1),
    targeted(122, "LOG_REQUEST_END", 0, 1),
    targeted(123, "GPS_INJECT_DATA", 0, 1),
    broadcast(124, "GPS2_RAW"),
    broadcast(125, "POWER_STATUS"),
    targeted(126, "SERIAL_CONTROL", 79, 80),
    broadcast(127, "GPS_RTK"),
    broadcast(128, "GPS2_RTK"),
    broadcast(129, "SCALED_IMU3"),
    broadcast(130, "DATA_TRANSMISSION_HANDSHAKE"),
    broadcast(131, "ENCAPSULATED_DATA"),
    broadcast(132, "DISTANCE_SENSOR"),
    broadcast(133, "TERRAIN_REQUEST"),
    broadcast(134, "TERRAIN_DATA"),
    broadcast(135, "TERRAIN_CHECK"),
    broadcast(136, "TERRAIN_REPORT"),
    broadcast(137, "SCALED_PRESSURE2"),
    broadcast(138, "ATT_POS_MOCAP"),
    targeted(139, "SET_ACTUATOR_CONTROL_TARGET", 41, 42),
    broadcast(140, "ACTUATOR_CONTROL_TARGET"),
    broadcast(141, "ALTITUDE"),
    broadcast(142, "RESOURCE_REQUEST"),
    broadcast(143, "SCALED_PRESSURE3"),
    broadcast(144, "FOLLOW_TARGET"),
    broadcast(146, "CONTROL_SYSTEM_STATE"),
    broadcast(147, "BATTERY_STATUS"),
    broadcast(148, "AUTOPILOT_VERSION"),
    broadcast(149, "LANDING_TARGET"),
    broadcast(162, "FENCE_STATUS"),
    broadcast(192, "MAG_CAL_REPORT"),
    broadcast(225, "EFI_STATUS"),
    broadcast(230, "ESTIMATOR_STATUS"),
    broadcast(231, "WIND_COV"),
    broadcast(232, "GPS_INPUT"),
    broadcast(233, "GPS_RTCM_DATA"),
    broadcast(234, "HIGH_LATENCY"),
    broadcast(235, "HIGH_LATENCY2"),
    broadcast(241, "VIBRATION"),
    broadcast(242, "HOME_POSITION"),
    system_targeted(243, "SET_HOME_POSITION", 52),
    broadcast(244, "MESSAGE_INTERVAL"),
    broadcast(245, "EXTENDED_SYS_STATE"),
    broadcast(246, "ADSB_VEHICLE"),
    broadcast(247, "COLLISION"),
    targeted(248, "V2_EXTENSION", 3, 4),
    broadcast(249, "MEMORY_VECT"),
    broadcast(250, "DEBUG_VECT"),
    broadcast(251, "NAMED_VALUE_FLOAT"),
    broadcast(252, "NAMED_VALUE_INT"),
    broadcast(253, "STATUSTEXT"),
    broadcast(254, "DEBUG"),
    targeted(256, "SETUP_SIGNING", 8, 9),
    broadcast(257, "BUTTON_CHANGE"),
    targeted(258, "PLAY_TUNE", 0, 1),
    broadcast(259, "CAMERA_INFORMATION"),
    broadcast(260, "CAMERA_SETTINGS"),
    broadcast(261, "STORAGE_INFORMATION"),
    broadcast(262, "CAMERA_CAPTURE_STATUS"),
    broadcast(263, "CAMERA_IMAGE_CAPTURED"),
    broadcast(264, "FLIGHT_INFORMATION"),
    broadcast(265, "MOUNT_ORIENTATION"),
    targeted(266, "LOGGING_DATA", 2, 3),
    targeted(267, "LOGGING_DATA_ACKED", 2, 3),
    targeted(268, "LOGGING_ACK", 2, 3),
    broadcast(269, "VIDEO_STREAM_INFORMATION"),
    broadcast(270, "VIDEO_STREAM_STATUS"),
    broadcast(299, "WIFI_CONFIG_AP"),
    broadcast(300, "PROTOCOL_VERSION"),
    broadcast(310, "UAVCAN_NODE_STATUS"),
    broadcast(311, "UAVCAN_NODE_INFO"),
    targeted(320, "PARAM_EXT_REQUEST_READ", 2, 3),
    targeted(321, "PARAM_EXT_REQUEST_LIST", 0, 1),
    broadcast(322, "PARAM_EXT_VALUE"),
    targeted(323, "PARAM_EXT_SET", 0, 1),
    broadcast(324, "PARAM_EXT_ACK"),
    broadcast(330, "OBSTACLE_DISTANCE"),
    broadcast(331, "ODOMETRY"),
    broadcast(332, "TRAJECTORY_REPRESENTATION_WAYPOINTS"),
    broadcast(333, "TRAJECTORY_REPRESENTATION_BEZIER"),
    broadcast(334, "CELLULAR_STATUS"),
    broadcast(335, "ISBD_LINK_STATUS"),
    broadcast(340, "UTM_GLOBAL_POSITION"),
    broadcast(350, "DEBUG_FLOAT_ARRAY"),
    broadcast(360, "ORBIT_EXECUTION_STATUS"),
    broadcast(365, "SMART_BATTERY_INFO"),
    broadcast(373, "GENERATOR_STATUS"),
    broadcast(375, "ACTUATOR_OUTPUT_STATUS"),
    broadcast(380, "TIME_ESTIMATE_TO_TARGET"),
    targeted(385, "TUNNEL", 2, 3),
    broadcast(390, "ONBOARD_COMPUTER_STATUS"),
    broadcast(395, "COMPONENT_INFORMATION"),
    targeted(400, "PLAY_TUNE_V2", 4, 5),
    targeted(401, "SUPPORTED_TUNES", 0, 1),
    broadcast(9000, "WHEEL_DISTANCE"),
    targeted(12900, "OPEN_DRONE_ID_BASIC_ID", 0, 1),
    targeted(12901, "OPEN_DRONE_ID_LOCATION", 0, 1),
    targeted(12902, "OPEN_DRONE_ID_AUTHENTICATION", 0, 1),
    targeted(12903, "OPEN_DRONE_ID_SELF_ID", 0, 1),
    targeted(12904, "OPEN_DRONE_ID_SYSTEM", 0, 1),
    targeted(12905, "OPEN_DRONE_ID_OPERATOR_ID", 0, 1),
    targeted(12915, "OPEN_DRONE_ID_MESSAGE_PACK", 0, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_by_id() {
        for pair in MESSAGES.windows(2) {
            assert!(pair[0].id < pair[1].id, "{} >= {}", pair[0].id, pair[1].id);
        }
    }

    #[test]
    fn by_id_finds_known_messages() {
        assert_eq!(by_id(0).unwrap().name, "HEARTBEAT");
        assert_eq!(by_id(4).unwrap().name, "PING");
        assert_eq!(by_id(321).unwrap().name, "PARAM_EXT_REQUEST_LIST");
        assert!(by_id(3).is_none());
        assert!(by_id(1_000_000).is_none());
    }

    #[test]
    fn by_name_agrees_with_by_id() {
        for info in MESSAGES {
            assert_eq!(by_name(info.name).unwrap().id, info.id);
        }
        assert!(by_name("NOT_A_MESSAGE").is_none());
        assert!(by_name("heartbeat").is_none());
    }

    #[test]
    fn target_offsets_for_common_messages() {
        let ping = by_id(4).unwrap();
        assert_eq!(ping.target_system, Some(12));
        assert_eq!(ping.target_component, Some(13));

        let set_mode = by_id(11).unwrap();
        assert_eq!(set_mode.target_system, Some(4));
        assert_eq!(set_mode.target_component, None);

        let heartbeat = by_id(0).unwrap();
        assert_eq!(heartbeat.target_system, None);
        assert_eq!(heartbeat.target_component, None);
    }
}
