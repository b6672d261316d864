use alloy::sol;

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract UCS03Zkgm {
        struct Instruction {
            uint8 version;
            uint8 opcode;
            bytes operand;
        }

        struct FungibleAssetOrder {
            bytes sender;
            bytes receiver;
            bytes baseToken;
            uint256 baseAmount;
            string baseTokenSymbol;
            string baseTokenName;
            uint8 baseTokenDecimals;
            uint256 baseTokenPath;
            bytes quoteToken;
            uint256 quoteAmount;
        }

        function send(
            uint32 channelId,
            uint64 timeoutHeight,
            uint64 timeoutTimestamp,
            bytes32 salt,
            Instruction calldata instruction
        ) external payable;
    }
);
