/// Touch-typing finger responsible for each key on a US layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::Display)]
pub enum Finger {
    #[strum(serialize = "left pinky")]
    LeftPinky,
    #[strum(serialize = "left ring")]
    LeftRing,
    #[strum(serialize = "left middle")]
    LeftMiddle,
    #[strum(serialize = "left index")]
    LeftIndex,
    #[strum(serialize = "right index")]
    RightIndex,
    #[strum(serialize = "right middle")]
    RightMiddle,
    #[strum(serialize = "right ring")]
    RightRing,
    #[strum(serialize = "right pinky")]
    RightPinky,
    #[strum(serialize = "thumbs")]
    Thumbs,
}

pub fn finger_for(key: char) -> Option<Finger> {
    use Finger::*;

    let key = key.to_lowercase().next().unwrap_or(key);
    let finger = match key {
        '`' | '~' | '1' | '!' | 'q' | 'a' | 'z' => LeftPinky,
        '2' | '@' | 'w' | 's' | 'x' => LeftRing,
        '3' | '#' | 'e' | 'd' | 'c' => LeftMiddle,
        '4' | '$' | '5' | '%' | 'r' | 't' | 'f' | 'g' | 'v' | 'b' => LeftIndex,
        '6' | '^' | '7' | '&' | 'y' | 'u' | 'h' | 'j' | 'n' | 'm' => RightIndex,
        '8' | '*' | 'i' | 'k' | ',' | '<' => RightMiddle,
        '9' | '(' | 'o' | 'l' | '.' | '>' => RightRing,
        '0' | ')' | '-' | '_' | '=' | '+' | 'p' | '[' | '{' | ']' | '}' | '\\' | '|' | ';'
        | ':' | '\'' | '"' | '/' | '?' => RightPinky,
        ' ' => Thumbs,
        _ => return None,
    };
    Some(finger)
}
