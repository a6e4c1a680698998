//! Frame command handlers.

use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::json;
use skein_core::Config;
use skein_wire::{read_frame, Envelope, Frame, MessageType, RawPayload};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{EncodeFrameArgs, InspectFrameArgs, OutputFormat, ReadFramesArgs};

/// Handle the frame inspect command.
pub fn handle_inspect(args: InspectFrameArgs) -> Result<()> {
    let frame = decode_hex(&args.hex)?;
    print_frames(&[frame], args.format)
}

/// Handle the frame read command.
pub async fn handle_read(args: ReadFramesArgs, config: &Config) -> Result<()> {
    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let mut reader = BufReader::new(file);

    let mut frames = Vec::new();
    while !reader.fill_buf().await?.is_empty() {
        let frame = read_frame(&mut reader, &config.wire)
            .await
            .with_context(|| format!("Failed to read frame {}", frames.len() + 1))?;
        frames.push(frame);
    }
    print_frames(&frames, args.format)
}

/// Handle the frame encode command.
pub fn handle_encode(args: EncodeFrameArgs, config: &Config) -> Result<()> {
    println!("{}", encode_hex(&args, config)?);
    Ok(())
}

fn encode_hex(args: &EncodeFrameArgs, config: &Config) -> Result<String> {
    let message_type = MessageType::try_from(args.type_code)?;
    let payload = hex::decode(strip_whitespace(&args.payload)).context("Payload is not valid hex")?;
    let client_id = args.client_id.clone().unwrap_or_else(|| config.wire.client_id.clone());

    let envelope = Envelope::new(
        args.correlation_id,
        client_id,
        RawPayload::new(message_type, args.version, payload),
    );
    if envelope.size_in_bytes() > config.wire.max_frame_bytes {
        anyhow::bail!(
            "Frame of {} bytes exceeds wire.max_frame_bytes ({})",
            envelope.size_in_bytes(),
            config.wire.max_frame_bytes
        );
    }
    Ok(hex::encode(envelope.encode()?))
}

fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

fn decode_hex(input: &str) -> Result<Frame> {
    let bytes = hex::decode(strip_whitespace(input)).context("Frame is not valid hex")?;
    Frame::decode(Bytes::from(bytes)).context("Failed to decode frame")
}

fn frame_json(frame: &Frame) -> serde_json::Value {
    json!({
        "totalSize": frame.total_size(),
        "type": frame.message_type().as_str(),
        "typeCode": frame.message_type().code(),
        "version": frame.version(),
        "correlationId": frame.correlation_id(),
        "clientId": frame.client_id(),
        "payloadBytes": frame.payload().len(),
    })
}

fn describe_frame(frame: &Frame) -> String {
    format!(
        "  type={} ({}) version={} correlation_id={} client_id={:?} size={} payload={} bytes",
        frame.message_type(),
        frame.message_type().code(),
        frame.version(),
        frame.correlation_id(),
        frame.client_id(),
        frame.total_size(),
        frame.payload().len()
    )
}

fn print_frames(frames: &[Frame], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let values: Vec<_> = frames.iter().map(frame_json).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        OutputFormat::Text => {
            for frame in frames {
                println!("{}", describe_frame(frame));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn sample() -> Bytes {
        Envelope::new(7, "cli", RawPayload::new(MessageType::GetResponse, 1, &b"ok"[..]))
            .encode()
            .unwrap()
    }

    #[test]
    fn test_decode_hex_ignores_whitespace() {
        let encoded = hex::encode(sample());
        let (head, tail) = encoded.split_at(10);
        let frame = decode_hex(&format!(" {head}\n {tail} ")).unwrap();

        assert_eq!(frame.message_type(), MessageType::GetResponse);
        assert_eq!(frame.client_id(), "cli");
        assert_eq!(frame.total_size(), 25);
    }

    #[test]
    fn test_decode_hex_errors() {
        let err = decode_hex("zz").unwrap_err();
        assert!(format!("{err:#}").contains("not valid hex"));

        let err = decode_hex("0000").unwrap_err();
        assert!(format!("{err:#}").contains("truncated"));
    }

    #[test]
    fn test_frame_json() {
        let frame = Frame::decode(sample()).unwrap();
        let value = frame_json(&frame);
        assert_eq!(value["type"], "get_response");
        assert_eq!(value["typeCode"], 3);
        assert_eq!(value["correlationId"], 7);
        assert_eq!(value["payloadBytes"], 2);
        assert!(describe_frame(&frame).contains("client_id=\"cli\""));
    }

    #[test]
    fn test_encode_then_inspect() {
        let args = EncodeFrameArgs {
            type_code: 6,
            version: 2,
            correlation_id: 41,
            client_id: None,
            payload: "de ad".to_string(),
        };
        let encoded = encode_hex(&args, &Config::default()).unwrap();
        let frame = decode_hex(&encoded).unwrap();

        assert_eq!(frame.message_type(), MessageType::TtlRequest);
        assert_eq!(frame.version(), 2);
        assert_eq!(frame.correlation_id(), 41);
        assert_eq!(frame.client_id(), "skein");
        assert_eq!(&frame.payload()[..], &[0xde, 0xad]);
    }

    #[test]
    fn test_encode_rejects_unknown_type_and_oversize() {
        let mut args = EncodeFrameArgs {
            type_code: 42,
            version: 1,
            correlation_id: 0,
            client_id: Some("c".to_string()),
            payload: String::new(),
        };
        let err = encode_hex(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("unknown message type code 42"));

        args.type_code = 0;
        args.payload = "00".repeat(64);
        let mut config = Config::default();
        config.wire.max_frame_bytes = 32;
        let err = encode_hex(&args, &config).unwrap_err();
        assert!(err.to_string().contains("exceeds wire.max_frame_bytes"));
    }

    #[tokio::test]
    async fn test_read_capture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample()).unwrap();
        file.write_all(&sample()).unwrap();
        file.flush().unwrap();

        let args = ReadFramesArgs { file: file.path().to_path_buf(), format: OutputFormat::Json };
        handle_read(args, &Config::default()).await.unwrap();

        // A trailing partial frame is an error.
        file.write_all(&sample()[..5]).unwrap();
        file.flush().unwrap();
        let args = ReadFramesArgs { file: file.path().to_path_buf(), format: OutputFormat::Text };
        let err = handle_read(args, &Config::default()).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read frame 3"));
    }
}
