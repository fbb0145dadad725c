use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// How the per-frame channel values of a motion row are laid out.
///
/// The file's own `CHANNELS` declarations are not used to decode rows,
/// the caller states the layout up front.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// Root translation triple followed by one rotation triple per joint.
    #[default]
    Standard,
    /// A translation triple and a rotation triple for every joint
    /// (Blender exports). Only the root's translation is kept.
    Blender,
}

impl ChannelLayout {
    /// Number of values in one motion row.
    pub fn row_width(self, joint_count: usize) -> usize {
        match self {
            ChannelLayout::Standard => 3 * (joint_count + 1),
            ChannelLayout::Blender => 6 * joint_count,
        }
    }

    /// Number of channels each joint is expected to declare.
    fn declared_width(self, joint_index: usize) -> usize {
        match (self, joint_index) {
            (ChannelLayout::Standard, 0) => 6,
            (ChannelLayout::Standard, _) => 3,
            (ChannelLayout::Blender, _) => 6,
        }
    }
}

/// Raw result of parsing a bvh file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBvh {
    /// Joint names, the root comes first.
    pub joints: Vec<String>,
    /// Parent index of each joint, the root is its own parent.
    pub parents: Vec<usize>,
    /// Rest pose translation of each joint relative to its parent.
    pub offsets: Vec<Vec3>,
    /// Channel count declared by each joint's `CHANNELS` line (0 if absent).
    pub declared_channels: Vec<usize>,
    pub num_frames: usize,
    /// Duration of one frame in seconds.
    pub frame_time: f64,
    pub fps: u32,
    /// Canonical channel samples, `joints + 1` triples per frame:
    /// the root translation followed by every joint's Euler angles in degrees.
    pub channels: Vec<Vec3>,
}

impl ParsedBvh {
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Canonical channel triples of a single frame.
    pub fn frame_channels(&self, frame_index: usize) -> &[Vec3] {
        let width = self.joint_count() + 1;
        &self.channels[frame_index * width..(frame_index + 1) * width]
    }
}

/// Checks that the root is its own parent and every other joint comes after its parent.
pub fn validate_hierarchy(parents: &[usize]) -> Result<(), ParseError> {
    for (joint, &parent) in parents.iter().enumerate() {
        let valid = match joint {
            0 => parent == 0,
            _ => parent < joint,
        };
        if valid == false {
            return Err(ParseError::ParentOrder { joint, parent });
        }
    }
    Ok(())
}

const HIERARCHY_KEYWORD: &str = "HIERARCHY";
const ROOT_KEYWORD: &str = "ROOT";
const JOINT_KEYWORD: &str = "JOINT";
const ENDSITE_KEYWORDS: [&str; 2] = ["End", "Site"];
const OFFSET_KEYWORD: &str = "OFFSET";
const CHANNELS_KEYWORD: &str = "CHANNELS";
const OPEN_BRACE: &str = "{";
const CLOSE_BRACE: &str = "}";
const MOTION_KEYWORD: &str = "MOTION";
const FRAMES_KEYWORD: &str = "Frames";
const FRAME_TIME_KEYWORDS: [&str; 2] = ["Frame", "Time"];

/// Line oriented parser state.
#[derive(Default)]
struct BvhParser {
    joints: Vec<String>,
    parents: Vec<usize>,
    offsets: Vec<Vec3>,
    declared_channels: Vec<usize>,
    /// Indices of the joints whose blocks are currently open.
    open_joints: Vec<usize>,
    brace_depth: usize,
    in_end_site: bool,
    in_motion: bool,
    num_frames: Option<usize>,
    frame_time: Option<f64>,
    rows: Vec<Vec<f32>>,
}

/// Parses the hierarchy and motion sections of a bvh file.
pub fn parse_bvh(source: &str, layout: ChannelLayout) -> Result<ParsedBvh, ParseError> {
    let mut parser = BvhParser::default();

    for (line_index, line) in source.lines().enumerate() {
        let line_num = line_index + 1;
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }

        match parser.in_motion {
            false => parser.hierarchy_line(line_num, &tokens)?,
            true => parser.motion_line(line_num, &tokens, layout)?,
        }
    }

    parser.finish(layout)
}

impl BvhParser {
    fn hierarchy_line(&mut self, line: usize, tokens: &[&str]) -> Result<(), ParseError> {
        match tokens[0] {
            HIERARCHY_KEYWORD => {}
            ROOT_KEYWORD => {
                if self.joints.is_empty() == false {
                    return Err(ParseError::MultipleRoots { line });
                }
                self.open_joint(line, tokens, 0)?;
            }
            JOINT_KEYWORD => {
                if self.in_end_site {
                    return Err(ParseError::UnexpectedLine { line });
                }
                let parent = *self
                    .open_joints
                    .last()
                    .ok_or(ParseError::OrphanJoint { line })?;
                self.open_joint(line, tokens, parent)?;
            }
            first if first == ENDSITE_KEYWORDS[0] && tokens.get(1) == Some(&ENDSITE_KEYWORDS[1]) => {
                if self.in_end_site {
                    return Err(ParseError::UnexpectedLine { line });
                }
                if self.open_joints.is_empty() {
                    return Err(ParseError::OrphanJoint { line });
                }
                self.in_end_site = true;
            }
            OFFSET_KEYWORD => {
                let values = tokens[1..]
                    .iter()
                    .map(|token| parse_finite(line, token))
                    .collect::<Result<Vec<_>, _>>()?;
                let [x, y, z] = <[f32; 3]>::try_from(values.as_slice()).map_err(|_| {
                    ParseError::MalformedOffset {
                        line,
                        found: values.len(),
                    }
                })?;

                // End site offsets describe bone tips only.
                if self.in_end_site == false {
                    let joint = *self
                        .open_joints
                        .last()
                        .ok_or(ParseError::UnexpectedOffset { line })?;
                    self.offsets[joint] = Vec3::new(x, y, z);
                }
            }
            CHANNELS_KEYWORD => {
                let joint = match self.in_end_site {
                    true => None,
                    false => self.open_joints.last().copied(),
                };
                let joint = joint.ok_or(ParseError::UnexpectedLine { line })?;
                let count = tokens
                    .get(1)
                    .ok_or(ParseError::UnexpectedLine { line })
                    .and_then(|token| parse_number::<usize>(line, token))?;
                self.declared_channels[joint] = count;
            }
            OPEN_BRACE => self.brace_depth += 1,
            CLOSE_BRACE => {
                if self.brace_depth == 0 {
                    return Err(ParseError::UnexpectedCloseBrace { line });
                }
                self.brace_depth -= 1;

                match self.in_end_site {
                    true => self.in_end_site = false,
                    false => {
                        self.open_joints
                            .pop()
                            .ok_or(ParseError::UnexpectedCloseBrace { line })?;
                    }
                }
            }
            MOTION_KEYWORD => {
                self.check_hierarchy_closed()?;
                self.in_motion = true;
            }
            _ => return Err(ParseError::UnexpectedLine { line }),
        }

        Ok(())
    }

    fn open_joint(&mut self, line: usize, tokens: &[&str], parent: usize) -> Result<(), ParseError> {
        let name = tokens
            .get(1)
            .ok_or(ParseError::MissingJointName { line })?;

        self.joints.push(name.to_string());
        self.parents.push(parent);
        self.offsets.push(Vec3::ZERO);
        self.declared_channels.push(0);
        self.open_joints.push(self.joints.len() - 1);
        Ok(())
    }

    fn check_hierarchy_closed(&self) -> Result<(), ParseError> {
        if self.joints.is_empty() {
            return Err(ParseError::MissingRoot);
        }
        if self.brace_depth > 0 || self.open_joints.is_empty() == false || self.in_end_site {
            return Err(ParseError::UnclosedBlocks {
                open: usize::max(self.brace_depth, self.open_joints.len()),
            });
        }
        Ok(())
    }

    fn motion_line(
        &mut self,
        line: usize,
        tokens: &[&str],
        layout: ChannelLayout,
    ) -> Result<(), ParseError> {
        // SAFETY: `tokens` is never empty, blank lines are skipped by the caller.
        let last = tokens[tokens.len() - 1];

        if tokens[0].starts_with(FRAMES_KEYWORD) {
            self.num_frames = Some(parse_number(line, last)?);
            return Ok(());
        }

        if tokens[0] == FRAME_TIME_KEYWORDS[0]
            && tokens
                .get(1)
                .is_some_and(|t| t.starts_with(FRAME_TIME_KEYWORDS[1]))
        {
            let value = parse_number::<f64>(line, last)?;
            if value <= 0.0 || value.is_finite() == false {
                return Err(ParseError::InvalidFrameTime { line, value });
            }
            self.frame_time = Some(value);
            return Ok(());
        }

        let expected = layout.row_width(self.joints.len());
        if tokens.len() != expected {
            return Err(ParseError::ChannelWidthMismatch {
                line,
                expected,
                found: tokens.len(),
            });
        }

        let row = tokens
            .iter()
            .map(|token| parse_finite(line, token))
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.push(row);

        Ok(())
    }

    fn finish(self, layout: ChannelLayout) -> Result<ParsedBvh, ParseError> {
        if self.in_motion == false {
            self.check_hierarchy_closed()?;
            return Err(ParseError::MissingFrameCount);
        }

        let num_frames = self.num_frames.ok_or(ParseError::MissingFrameCount)?;
        let frame_time = self.frame_time.ok_or(ParseError::MissingFrameTime)?;
        if self.rows.len() != num_frames {
            return Err(ParseError::FrameCountMismatch {
                declared: num_frames,
                found: self.rows.len(),
            });
        }

        validate_hierarchy(&self.parents)?;
        self.warn_channel_mismatch(layout);

        let joint_count = self.joints.len();
        let mut channels = Vec::with_capacity(num_frames * (joint_count + 1));
        for row in &self.rows {
            let triples = row.chunks_exact(3).map(Vec3::from_slice);
            match layout {
                ChannelLayout::Standard => channels.extend(triples),
                ChannelLayout::Blender => {
                    // Root translation & rotation, then only the rotation of every other joint.
                    channels.extend(
                        triples
                            .enumerate()
                            .filter(|(i, _)| *i < 2 || i % 2 == 1)
                            .map(|(_, v)| v),
                    );
                }
            }
        }

        Ok(ParsedBvh {
            joints: self.joints,
            parents: self.parents,
            offsets: self.offsets,
            declared_channels: self.declared_channels,
            num_frames,
            frame_time,
            fps: (1.0 / frame_time).round() as u32,
            channels,
        })
    }

    fn warn_channel_mismatch(&self, layout: ChannelLayout) {
        let mismatched = self
            .declared_channels
            .iter()
            .enumerate()
            .filter(|&(i, &count)| count != 0 && count != layout.declared_width(i))
            .map(|(i, _)| self.joints[i].as_str())
            .collect::<Vec<_>>();

        if mismatched.is_empty() == false {
            warn!(
                "Declared channels of {:?} do not match the {:?} layout, rotations may be misread.",
                mismatched, layout
            );
        }
    }
}

fn parse_number<T: std::str::FromStr>(line: usize, token: &str) -> Result<T, ParseError> {
    token.parse::<T>().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Channel and offset values, `nan` and `inf` are rejected.
fn parse_finite(line: usize, token: &str) -> Result<f32, ParseError> {
    match parse_number::<f32>(line, token)? {
        value if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidNumber {
            line,
            token: token.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_JOINTS: &str = "\
HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
\tJOINT Spine
\t{
\t\tOFFSET 0.0 1.0 0.0
\t\tCHANNELS 3 Zrotation Yrotation Xrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0.0 0.5 0.0
\t\t}
\t}
}
MOTION
Frames: 2
Frame Time: 0.0333333
0 0 0 0 0 0 0 0 0
1 0 0 10 20 30 40 50 60
";

    const BRANCHING: &str = "\
HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
  JOINT LeftUpLeg
  {
    OFFSET 1 0 0
    CHANNELS 3 Zrotation Yrotation Xrotation
    JOINT LeftLeg
    {
      OFFSET 0 -2 0
      CHANNELS 3 Zrotation Yrotation Xrotation
      End Site
      {
        OFFSET 0 -1 0
      }
    }
  }
  JOINT RightUpLeg
  {
    OFFSET -1 0 0
    CHANNELS 3 Zrotation Yrotation Xrotation
    End Site
    {
      OFFSET 0 -3 0
    }
  }
  JOINT Spine
  {
    OFFSET 0 1 0
    CHANNELS 3 Zrotation Yrotation Xrotation
    End Site
    {
      OFFSET 0 1 0
    }
  }
}
MOTION
Frames: 1
Frame Time: 0.008333
0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";

    #[test]
    fn parses_skeleton_and_motion() {
        let bvh = parse_bvh(TWO_JOINTS, ChannelLayout::Standard).unwrap();

        assert_eq!(bvh.joints, vec!["Hips", "Spine"]);
        assert_eq!(bvh.parents, vec![0, 0]);
        assert_eq!(bvh.offsets, vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)]);
        assert_eq!(bvh.declared_channels, vec![6, 3]);
        assert_eq!(bvh.num_frames, 2);
        assert_eq!(bvh.fps, 30);
        assert_eq!(bvh.channels.len(), 6);
        assert_eq!(
            bvh.frame_channels(1),
            &[
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(10.0, 20.0, 30.0),
                Vec3::new(40.0, 50.0, 60.0),
            ]
        );
    }

    #[test]
    fn closing_braces_restore_parents() {
        let bvh = parse_bvh(BRANCHING, ChannelLayout::Standard).unwrap();

        assert_eq!(bvh.joints, vec!["Hips", "LeftUpLeg", "LeftLeg", "RightUpLeg", "Spine"]);
        assert_eq!(bvh.parents, vec![0, 0, 1, 0, 0]);
        assert_eq!(bvh.offsets[2], Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(bvh.offsets[3], Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bvh.fps, 120);
        assert_eq!(bvh.parents[bvh.parents[0]], bvh.parents[0]);
        for (j, parent) in bvh.parents.iter().enumerate().skip(1) {
            assert!(*parent < j);
        }
    }

    #[test]
    fn reassembles_blender_layout() {
        let source = TWO_JOINTS
            .replace("CHANNELS 3", "CHANNELS 6 Xposition Yposition Zposition")
            .replace(
                "0 0 0 0 0 0 0 0 0\n1 0 0 10 20 30 40 50 60",
                "0 0 0 0 0 0 0 1 0 0 0 0\n1 0 0 10 20 30 0 1 0 40 50 60",
            );
        let bvh = parse_bvh(&source, ChannelLayout::Blender).unwrap();

        assert_eq!(bvh.channels.len(), 6);
        assert_eq!(
            bvh.frame_channels(1),
            &[
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(10.0, 20.0, 30.0),
                Vec3::new(40.0, 50.0, 60.0),
            ]
        );
    }

    #[test]
    fn reports_invalid_numbers_with_line() {
        let source = TWO_JOINTS.replace("1 0 0 10", "1 0 0 1o");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::InvalidNumber {
                line: 20,
                token: "1o".to_string()
            })
        );

        let source = TWO_JOINTS.replace("OFFSET 0.0 1.0 0.0", "OFFSET 0.0 abc 0.0");
        assert!(matches!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::InvalidNumber { line: 8, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        let source = TWO_JOINTS.replace("1 0 0 10", "nan inf 0 10");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::InvalidNumber {
                line: 20,
                token: "nan".to_string()
            })
        );

        let source = TWO_JOINTS.replace("OFFSET 0.0 1.0 0.0", "OFFSET 0.0 -inf 0.0");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::InvalidNumber {
                line: 8,
                token: "-inf".to_string()
            })
        );
    }

    #[test]
    fn rejects_unbalanced_braces() {
        let extra_close = TWO_JOINTS.replace("MOTION", "}\nMOTION");
        assert_eq!(
            parse_bvh(&extra_close, ChannelLayout::Standard),
            Err(ParseError::UnexpectedCloseBrace { line: 16 })
        );

        let missing_close = TWO_JOINTS.replacen("\t}\n}\n", "\t}\n", 1);
        assert!(matches!(
            parse_bvh(&missing_close, ChannelLayout::Standard),
            Err(ParseError::UnclosedBlocks { .. })
        ));
    }

    #[test]
    fn rejects_frame_count_mismatch() {
        let source = TWO_JOINTS.replace("Frames: 2", "Frames: 3");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::FrameCountMismatch {
                declared: 3,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_short_rows() {
        let source = TWO_JOINTS.replace("1 0 0 10 20 30 40 50 60", "1 0 0 10 20 30 40 50");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::ChannelWidthMismatch {
                line: 20,
                expected: 9,
                found: 8
            })
        );

        // A standard file read with the blender layout is too narrow.
        assert!(matches!(
            parse_bvh(TWO_JOINTS, ChannelLayout::Blender),
            Err(ParseError::ChannelWidthMismatch { expected: 12, .. })
        ));
    }

    #[test]
    fn rejects_missing_motion_declarations() {
        let source = TWO_JOINTS.replace("Frame Time: 0.0333333\n", "");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::MissingFrameTime)
        );

        let source = TWO_JOINTS.replace("Frames: 2\n", "");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::MissingFrameCount)
        );

        let hierarchy_only = TWO_JOINTS.split("MOTION").next().unwrap();
        assert_eq!(
            parse_bvh(hierarchy_only, ChannelLayout::Standard),
            Err(ParseError::MissingFrameCount)
        );

        let source = TWO_JOINTS.replace("0.0333333", "0");
        assert_eq!(
            parse_bvh(&source, ChannelLayout::Standard),
            Err(ParseError::InvalidFrameTime {
                line: 18,
                value: 0.0
            })
        );
    }

    #[test]
    fn rejects_misplaced_joints() {
        assert_eq!(
            parse_bvh("HIERARCHY\nJOINT Arm\n", ChannelLayout::Standard),
            Err(ParseError::OrphanJoint { line: 2 })
        );
        assert_eq!(
            parse_bvh("HIERARCHY\nMOTION\n", ChannelLayout::Standard),
            Err(ParseError::MissingRoot)
        );

        let two_roots = TWO_JOINTS.replace("MOTION", "ROOT Other\n{\n}\nMOTION");
        assert_eq!(
            parse_bvh(&two_roots, ChannelLayout::Standard),
            Err(ParseError::MultipleRoots { line: 16 })
        );

        let unnamed = TWO_JOINTS.replace("JOINT Spine", "JOINT");
        assert_eq!(
            parse_bvh(&unnamed, ChannelLayout::Standard),
            Err(ParseError::MissingJointName { line: 6 })
        );
    }

    #[test]
    fn validates_parent_order() {
        assert_eq!(validate_hierarchy(&[0, 0, 1, 1]), Ok(()));
        assert_eq!(
            validate_hierarchy(&[0, 2, 0]),
            Err(ParseError::ParentOrder {
                joint: 1,
                parent: 2
            })
        );
        assert_eq!(
            validate_hierarchy(&[1, 0]),
            Err(ParseError::ParentOrder {
                joint: 0,
                parent: 1
            })
        );
    }
}
