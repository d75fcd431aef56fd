use voxlead_types::CallAction;
use voxlead_voice::{encode_greeting_and_gather, encode_reply_and_gather, GatherParams, VoiceParams};

const HOSTILE: &[&str] = &[
    "<",
    ">",
    "&",
    "'",
    "\"",
    "&amp;",
    "]]><Hangup/>",
    "<Say>nested</Say>",
    "Tom & Jerry's \"flat\" <3 rooms>",
    "l'appartement à 300 000 € <négociable>",
];

/// Strips the markup this encoder itself writes, leaving only what came from
/// the inputs; any remaining `<`, `>` or `"` means an input leaked through.
fn leaked_markup(xml: &str) -> bool {
    let mut residue = xml.to_string();
    for tag in [
        "<Response>",
        "</Response>",
        "</Say>",
        "</Gather>",
        "<Hangup/>",
    ] {
        residue = residue.replace(tag, "");
    }
    // Opening tags carry attributes; drop up to the closing `>` of each.
    for open in ["<Say ", "<Gather "] {
        while let Some(start) = residue.find(open) {
            let Some(len) = residue[start..].find('>') else {
                return true;
            };
            residue.replace_range(start..start + len + 1, "");
        }
    }
    residue.contains('<') || residue.contains('>') || residue.contains('"')
}

#[test]
fn every_input_position_is_escaped() {
    for &hostile in HOSTILE {
        let voice = VoiceParams::new(hostile, hostile);
        let params = GatherParams {
            action_url: format!("https://voice.example/webhooks/speech?callId={hostile}"),
            hints: Some(hostile.to_string()),
            no_response_message: hostile.to_string(),
        };

        let greeting = encode_greeting_and_gather(hostile, &voice, &params);
        assert!(!leaked_markup(&greeting), "greeting leaked {hostile:?}: {greeting}");

        for action in [CallAction::Continue, CallAction::End] {
            let reply = encode_reply_and_gather(hostile, &voice, &params, action);
            assert!(!leaked_markup(&reply), "reply leaked {hostile:?}: {reply}");
        }
    }
}
